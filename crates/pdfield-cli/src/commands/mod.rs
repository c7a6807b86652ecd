//! Subcommands and the wiring they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod labels;
pub mod output;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use pdfield_core::models::config::PdfieldConfig;
use pdfield_core::{DisabledFallback, DocumentReader, FallbackResolver, PdfTextReader, RequestOrchestrator};
use pdfield_rag::RagResolver;

/// Configuration from `--config`, or the defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PdfieldConfig> {
    match config_path {
        Some(path) => PdfieldConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e)),
        None => Ok(PdfieldConfig::default()),
    }
}

/// Apply a `--data-root` override.
pub fn with_data_root(mut config: PdfieldConfig, data_root: Option<PathBuf>) -> PdfieldConfig {
    if let Some(root) = data_root {
        config.documents.data_root = root;
    }
    config
}

/// Orchestrator for `config`, with the retrieval fallback when it is enabled
/// and has credentials.
pub fn build_orchestrator(config: &PdfieldConfig) -> anyhow::Result<RequestOrchestrator> {
    let registry = config.label_registry()?;
    let reader: Arc<dyn DocumentReader> = Arc::new(PdfTextReader::new());

    let fallback: Arc<dyn FallbackResolver> = if config.fallback.enabled {
        match RagResolver::from_config(&config.fallback, Arc::clone(&reader)) {
            Ok(resolver) => Arc::new(resolver),
            Err(e) => {
                warn!("Fallback unavailable ({}), missing fields stay empty", e);
                Arc::new(DisabledFallback)
            }
        }
    } else {
        info!("Fallback disabled by configuration");
        Arc::new(DisabledFallback)
    };

    Ok(RequestOrchestrator::new(
        Arc::new(registry),
        reader,
        fallback,
        &config.documents.data_root,
    ))
}
