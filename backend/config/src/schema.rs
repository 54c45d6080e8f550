//! CodeContext configuration schema.
//!
//! Every section deserializes from a partial YAML document; absent fields
//! fall back to the values in [`crate::defaults`].

use serde::{Deserialize, Serialize};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration, stored as `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeContextConfig {
    pub relay: RelayConfig,
    pub generation: GenerationConfig,
    pub context: ContextConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Cross-origin relay used to read GitHub files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// Prefix prepended to the user URL. Empty string fetches directly.
    pub base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELAY_BASE_URL.to_string(),
        }
    }
}

/// Hosted generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    pub api_base: String,
    pub model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Context budget. Both limits absent means everything is resent each turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transcript_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_source_chars: Option<usize>,
}

/// Document export target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub output_dir: String,
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_EXPORT_DIR.to_string(),
            file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling NDJSON logs; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}

/// Local web front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "generation:\n  model: gemini-1.5-flash\ncontext:\n  maxTranscriptChars: 4000\n";
        let config: CodeContextConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.generation.model, "gemini-1.5-flash");
        assert_eq!(config.generation.api_base, DEFAULT_API_BASE);
        assert_eq!(config.context.max_transcript_chars, Some(4000));
        assert_eq!(config.context.max_source_chars, None);
        assert_eq!(config.relay.base_url, DEFAULT_RELAY_BASE_URL);
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn empty_document_is_default() {
        let config: CodeContextConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, CodeContextConfig::default());
    }
}
