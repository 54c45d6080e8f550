//! Log Redaction Layer
//!
//! Scrubs Google API keys, `key=` query parameters, and bearer tokens from
//! strings prior to logging.

use once_cell::sync::Lazy;
use regex::Regex;

static GOOGLE_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{35}").unwrap());
static KEY_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([?&]key=)[^&\s]+").unwrap());
static BEARER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = KEY_PARAM_RE.replace_all(input, "${1}[REDACTED_KEY]");
    let redacted = GOOGLE_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    BEARER_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}

/// An error's display text with secrets scrubbed, for log fields.
pub fn redact_error(err: &dyn std::fmt::Display) -> String {
    redact_sensitive_data(&err.to_string())
}
