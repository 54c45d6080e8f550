//! `codecontext-config` — CodeContext runtime configuration.
//!
//! Provides:
//! - Typed config schema with per-field defaults
//! - YAML read/write with atomic backup rotation
//! - Default credential lookup from the environment
//! - Redaction for safe display
//! - Validation with path-qualified messages

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{default_api_key, default_api_key_with};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use redact::{mask_secret, redact};
pub use schema::{
    CodeContextConfig, ContextConfig, ExportConfig, GenerationConfig, LoggingConfig,
    RelayConfig, ServerConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};

/// Validate an already-loaded config, logging every finding.
///
/// Warnings are logged; any validation error aborts.
pub fn check(config: &CodeContextConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("{} ({} error(s) total)", first, report.errors.len());
    }
    Ok(())
}
