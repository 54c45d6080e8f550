//! Session API key with a configured default and a user override.

use serde::Serialize;

/// The key used for generation calls.
///
/// Never persisted. Blank input or the default itself restores the default.
#[derive(Clone, Default)]
pub struct ApiKeyState {
    default: String,
    current: String,
}

impl ApiKeyState {
    pub fn new(default: Option<String>) -> Self {
        let default = default.unwrap_or_default();
        Self {
            current: default.clone(),
            default,
        }
    }

    /// Apply the text typed into the key input.
    pub fn set_input(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() || input == self.default {
            self.current = self.default.clone();
        } else {
            self.current = input.to_string();
        }
    }

    pub fn effective(&self) -> &str {
        &self.current
    }

    pub fn is_default(&self) -> bool {
        self.current == self.default
    }

    pub fn is_set(&self) -> bool {
        !self.current.is_empty()
    }

    /// What the key input shows: empty while the default is in use.
    pub fn display_value(&self) -> &str {
        if self.is_default() {
            ""
        } else {
            &self.current
        }
    }

    pub fn view(&self) -> ApiKeyView {
        ApiKeyView {
            is_default: self.is_default(),
            is_set: self.is_set(),
            display_value: self.display_value().to_string(),
        }
    }
}

/// Key state as a front-end shows it.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub is_default: bool,
    pub is_set: bool,
    /// Value for the key input. Empty while the default is in use.
    pub display_value: String,
}

impl std::fmt::Debug for ApiKeyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyView")
            .field("is_default", &self.is_default)
            .field("is_set", &self.is_set)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ApiKeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyState")
            .field("is_default", &self.is_default())
            .field("is_set", &self.is_set())
            .finish()
    }
}
