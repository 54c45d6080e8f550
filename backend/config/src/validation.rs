//! Config validation with field paths in every message.

use crate::schema::CodeContextConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &CodeContextConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_relay(config, &mut report);
    validate_generation(config, &mut report);
    validate_context(config, &mut report);
    validate_export(config, &mut report);
    validate_server(config, &mut report);
    report
}

fn validate_relay(config: &CodeContextConfig, report: &mut ValidationReport) {
    let base = &config.relay.base_url;
    if base.is_empty() {
        report.warn(
            "relay.baseUrl",
            "No relay configured; files are fetched directly from GitHub",
        );
        return;
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        report.error("relay.baseUrl", "Relay base must be an http(s) URL");
    }
    if !base.ends_with('/') {
        report.error(
            "relay.baseUrl",
            "Relay base must end with '/' because the target URL is appended to it",
        );
    }
}

fn validate_generation(config: &CodeContextConfig, report: &mut ValidationReport) {
    if config.generation.model.trim().is_empty() {
        report.error("generation.model", "Model name cannot be empty");
    }
    if config.generation.api_base.trim().is_empty() {
        report.error("generation.apiBase", "API base cannot be empty");
    }
}

fn validate_context(config: &CodeContextConfig, report: &mut ValidationReport) {
    if config.context.max_transcript_chars == Some(0) {
        report.warn(
            "context.maxTranscriptChars",
            "A zero transcript budget drops all conversation history",
        );
    }
    if config.context.max_source_chars == Some(0) {
        report.warn(
            "context.maxSourceChars",
            "A zero source budget sends no source code to the model",
        );
    }
}

fn validate_export(config: &CodeContextConfig, report: &mut ValidationReport) {
    let name = &config.export.file_name;
    if name.trim().is_empty() {
        report.error("export.fileName", "Export file name cannot be empty");
    } else if name.contains('/') || name.contains('\\') {
        report.error("export.fileName", "Export file name must not contain path separators");
    } else if name.chars().any(|c| c == '"' || c.is_control()) {
        report.error(
            "export.fileName",
            "Export file name must not contain quotes or control characters",
        );
    } else if !name.to_ascii_lowercase().ends_with(".pdf") {
        report.warn("export.fileName", "Export writes a PDF; consider a .pdf extension");
    }
}

fn validate_server(config: &CodeContextConfig, report: &mut ValidationReport) {
    let port = config.server.port;
    if port == 0 {
        report.error("server.port", "Port must be non-zero");
    } else if port < 1024 {
        report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let report = validate(&CodeContextConfig::default());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn relay_without_trailing_slash() {
        let mut config = CodeContextConfig::default();
        config.relay.base_url = "https://relay.example.com".into();
        let report = validate(&config);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "relay.baseUrl");
    }

    #[test]
    fn empty_relay_only_warns() {
        let mut config = CodeContextConfig::default();
        config.relay.base_url.clear();
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn zero_port_and_empty_model() {
        let mut config = CodeContextConfig::default();
        config.server.port = 0;
        config.generation.model = " ".into();
        let report = validate(&config);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"server.port"));
        assert!(paths.contains(&"generation.model"));
    }

    #[test]
    fn export_name_must_be_header_safe() {
        for bad in ["a\".pdf", "a\r\nX-Injected: 1.pdf", "tab\tname.pdf"] {
            let mut config = CodeContextConfig::default();
            config.export.file_name = bad.into();
            let report = validate(&config);
            assert_eq!(report.errors.len(), 1, "{bad:?}");
            assert_eq!(report.errors[0].path, "export.fileName");
        }
    }

    #[test]
    fn non_pdf_export_name_warns() {
        let mut config = CodeContextConfig::default();
        config.export.file_name = "notes.html".into();
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "export.fileName");
    }
}
