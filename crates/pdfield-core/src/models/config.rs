//! Configuration structures for the extraction service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PatternError;
use crate::extraction::rules::{LabelDefinition, LabelRegistry};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main configuration for pdfield.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfieldConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Document resolution configuration.
    pub documents: DocumentConfig,

    /// Fallback resolver configuration.
    pub fallback: FallbackConfig,

    /// Extra labels registered on top of the built-in ones.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelDefinition>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,

    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Document resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Root directory job paths are resolved against.
    pub data_root: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("src/data"),
        }
    }
}

/// Retrieval-augmented fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Run the fallback for missing fields at all.
    pub enabled: bool,

    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,

    /// API key; `OPENAI_API_KEY` is used when unset.
    pub api_key: Option<String>,

    /// Chat model answering the extraction prompt.
    pub chat_model: String,

    /// Embedding model for chunking and retrieval.
    pub embedding_model: String,

    /// Sampling temperature; omitted from requests when unset. Some chat
    /// models reject anything but their own default.
    pub temperature: Option<f32>,

    /// Number of chunks retrieved as context.
    pub top_k: usize,

    /// Percentile of adjacent-sentence distances above which a chunk is split.
    pub breakpoint_percentile: f32,

    /// Network client timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-5-mini".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            temperature: None,
            top_k: 4,
            breakpoint_percentile: 95.0,
            timeout_secs: 120,
        }
    }
}

impl FallbackConfig {
    /// Configured key, or the environment's.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }
}

impl PdfieldConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Built-in labels plus the configured ones; a configured label with a
    /// built-in name replaces it.
    pub fn label_registry(&self) -> Result<LabelRegistry, PatternError> {
        let mut registry = LabelRegistry::with_builtins()?;
        for definition in &self.labels {
            registry.register_definition(definition)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PdfieldConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.documents.data_root, PathBuf::from("src/data"));
        assert_eq!(config.fallback.chat_model, "gpt-5-mini");
        assert_eq!(config.fallback.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.fallback.top_k, 4);
        assert_eq!(config.fallback.temperature, None);
        assert!(config.fallback.enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: PdfieldConfig =
            serde_json::from_str(r#"{"server": {"port": 9001}, "fallback": {"enabled": false}}"#).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.fallback.enabled);
        assert_eq!(config.fallback.top_k, 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PdfieldConfig::default();
        config.documents.data_root = PathBuf::from("/srv/pdfs");
        config.save(&path).unwrap();

        let loaded = PdfieldConfig::from_file(&path).unwrap();
        assert_eq!(loaded.documents.data_root, PathBuf::from("/srv/pdfs"));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let mut config = FallbackConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.resolved_api_key(), Some("sk-test".to_string()));
    }

    #[test]
    fn test_configured_label_replaces_builtin() {
        let config: PdfieldConfig = serde_json::from_str(
            r#"{"labels": [{"label": "carteira_oab", "fields": [{"field": "nome", "patterns": ["Nome:\\s*([^\\n]+)"]}]}]}"#,
        )
        .unwrap();

        let registry = config.label_registry().unwrap();
        let profile = registry.get(&Label::from("carteira_oab")).unwrap();
        assert_eq!(profile.bank.len(), 1);
        assert!(registry.contains(&Label::from("tela_sistema")));
    }
}
