//! Default values for every config field.

/// Public CORS relay; the target URL is appended verbatim.
pub const DEFAULT_RELAY_BASE_URL: &str = "https://cors-anywhere.herokuapp.com/";

/// Gemini REST API root.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "gemini-pro";

pub const DEFAULT_EXPORT_DIR: &str = ".";

pub const DEFAULT_EXPORT_FILE_NAME: &str = "CodeContextA.pdf";

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_BIND: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8787;

/// Primary env var holding the default credential.
pub const API_KEY_ENV: &str = "CODECONTEXT_API_KEY";

/// Fallback env var, shared with other Gemini tooling.
pub const API_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";
