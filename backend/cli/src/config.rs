use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use codecontext_config::{config_file_path, default_api_key, load_config, redact, CodeContextConfig};
use codecontext_engine::providers::GeminiProvider;
use codecontext_engine::{ApiKeyState, ContextBudget, ConversationEngine, Session};
use codecontext_markdown::{DocumentExporter, ExportOptions};
use codecontext_source::{RelayClient, SourceFetcher};

/// Everything a command needs: the loaded config file, where it lives, and
/// the default credential read from the environment.
#[derive(Clone)]
pub struct Runtime {
    pub config: CodeContextConfig,
    pub config_path: PathBuf,
    pub api_key: Option<String>,
}

impl Runtime {
    /// Load the config from `config_dir` (or the default directory). A
    /// missing file yields defaults. Validation is left to the caller so it
    /// can run after logging is up.
    pub async fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let dir = config_dir.unwrap_or_else(codecontext_config::config_dir);
        let config_path = config_file_path(&dir);
        let config = load_config(&config_path).await?;
        Ok(Self {
            config,
            config_path,
            api_key: default_api_key(),
        })
    }

    pub fn budget(&self) -> ContextBudget {
        ContextBudget {
            max_transcript_chars: self.config.context.max_transcript_chars,
            max_source_chars: self.config.context.max_source_chars,
        }
    }

    pub fn exporter(&self) -> DocumentExporter {
        DocumentExporter::new(&self.config.export.output_dir)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            file_name: self.config.export.file_name.clone(),
            ..ExportOptions::default()
        }
    }

    /// The effective config plus the environment credential, with every
    /// secret masked, for `config show`.
    pub fn redacted_view(&self) -> Result<Value> {
        let mut view = serde_json::to_value(&self.config)?;
        if let Value::Object(map) = &mut view {
            let key = self.api_key.clone().map_or(Value::Null, Value::String);
            map.insert("apiKey".to_string(), key);
        }
        Ok(redact(&view))
    }

    /// Wire the relay, the Gemini provider and the credential into a fresh
    /// session.
    pub fn build_session(&self) -> Session {
        let relay = RelayClient::new(self.config.relay.base_url.clone());
        let fetcher = SourceFetcher::new(Arc::new(relay));

        let provider = GeminiProvider::new().with_base_url(self.config.generation.api_base.clone());
        let engine = ConversationEngine::new(Arc::new(provider), self.config.generation.model.clone())
            .with_budget(self.budget());

        Session::new(fetcher, engine, ApiKeyState::new(self.api_key.clone()))
    }
}
