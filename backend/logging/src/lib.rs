//! Telemetry and structured logging components for CodeContext.
//!
//! Handles log redaction, console and rolling NDJSON output, and per-turn
//! diagnostic events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::TurnEventLogger;
pub use logger::init_logger;
pub use redact::{redact_error, redact_sensitive_data};
