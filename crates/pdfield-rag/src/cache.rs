//! Per-document index cache and per-label schema cache.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use pdfield_core::{ExtractionSchema, Label};
use tokio::sync::OnceCell;

use crate::index::VectorIndex;
use crate::Result;

/// Built indexes keyed by absolute document path.
///
/// Concurrent requests for the same path share a single build. A build that
/// fails leaves nothing behind, so the next request tries again.
#[derive(Default)]
pub struct IndexCache {
    entries: DashMap<PathBuf, Arc<OnceCell<Arc<VectorIndex>>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached index for `path`, building it with `build` on first use.
    pub async fn get_or_try_build<F, Fut>(&self, path: &Path, build: F) -> Result<Arc<VectorIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VectorIndex>>,
    {
        // the map guard must not be held across the build
        let cell = Arc::clone(&self.entries.entry(path.to_path_buf()).or_default());
        let index = cell.get_or_try_init(|| async { build().await.map(Arc::new) }).await?;
        Ok(Arc::clone(index))
    }

    pub fn get(&self, path: &Path) -> Option<Arc<VectorIndex>> {
        self.entries.get(path).and_then(|entry| entry.value().get().cloned())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Number of built indexes.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every field ever requested from the fallback, per label.
///
/// Only grows; it is kept for diagnostics and never read by the resolver.
#[derive(Default)]
pub struct SchemaCache {
    schemas: Mutex<HashMap<Label, ExtractionSchema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `fields` into the label's accumulated schema; newer descriptors win.
    pub fn record(&self, label: &Label, fields: &ExtractionSchema) {
        let mut schemas = self.schemas.lock();
        let schema = schemas.entry(label.clone()).or_default();
        for field in fields.iter() {
            schema.insert(field.name.as_str(), field.description.as_str());
        }
    }

    pub fn get(&self, label: &Label) -> Option<ExtractionSchema> {
        self.schemas.lock().get(label).cloned()
    }

    pub fn labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self.schemas.lock().keys().cloned().collect();
        labels.sort();
        labels
    }
}
