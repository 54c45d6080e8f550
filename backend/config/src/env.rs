//! Environment-supplied default credential.
//!
//! Read once at startup: `CODECONTEXT_API_KEY` first, then `GEMINI_API_KEY`.
//! Blank values count as unset.

use std::collections::HashMap;

use crate::defaults::{API_KEY_ENV, API_KEY_FALLBACK_ENV};

/// Resolve the default API key from the process environment.
pub fn default_api_key() -> Option<String> {
    default_api_key_with(&std::env::vars().collect())
}

/// Resolve the default API key from a provided map (useful for testing).
pub fn default_api_key_with(env: &HashMap<String, String>) -> Option<String> {
    [API_KEY_ENV, API_KEY_FALLBACK_ENV]
        .iter()
        .filter_map(|name| env.get(*name))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn primary_wins() {
        let vars = env(&[(API_KEY_ENV, "primary"), (API_KEY_FALLBACK_ENV, "fallback")]);
        assert_eq!(default_api_key_with(&vars).as_deref(), Some("primary"));
    }

    #[test]
    fn blank_primary_falls_back() {
        let vars = env(&[(API_KEY_ENV, "  "), (API_KEY_FALLBACK_ENV, "fallback")]);
        assert_eq!(default_api_key_with(&vars).as_deref(), Some("fallback"));
    }

    #[test]
    fn none_when_unset() {
        assert_eq!(default_api_key_with(&HashMap::new()), None);
    }
}
