//! Contract for the fallback resolver consulted for missing fields.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ExtractionSchema, FieldValues, Label};

/// Why a fallback attempt produced nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackFailure {
    /// The fallback is switched off by configuration.
    #[error("fallback disabled")]
    Disabled,

    /// The document vanished between resolution and indexing.
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    /// The document could not be read or split for indexing.
    #[error("failed to load document: {0}")]
    DocumentLoad(String),

    /// Building the semantic index failed.
    #[error("failed to build index: {0}")]
    IndexBuild(String),

    /// The retrieval or generation backend call failed.
    #[error("backend call failed: {0}")]
    Backend(String),

    /// The backend answered with something that is not a JSON object.
    #[error("malformed answer: {0}")]
    MalformedOutput(String),
}

/// Result of one fallback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// Values for (some of) the missing fields; unresolved ones are absent or omitted.
    Resolved(FieldValues),
    /// Nothing could be resolved.
    Failed(FallbackFailure),
}

impl FallbackOutcome {
    /// The resolved values, or an empty map on failure.
    pub fn into_values(self) -> FieldValues {
        match self {
            FallbackOutcome::Resolved(values) => values,
            FallbackOutcome::Failed(_) => FieldValues::new(),
        }
    }

    pub fn failure(&self) -> Option<&FallbackFailure> {
        match self {
            FallbackOutcome::Resolved(_) => None,
            FallbackOutcome::Failed(reason) => Some(reason),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure().is_some()
    }
}

/// Resolves fields the pattern pass could not.
///
/// Implementations never fail the job: every internal problem is reported as
/// [`FallbackOutcome::Failed`] and the job continues with pattern results only.
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    /// Try to resolve `missing` (field → caller's descriptor) from the document at `document`.
    async fn resolve(&self, label: &Label, missing: &ExtractionSchema, document: &Path) -> FallbackOutcome;
}

/// Resolver used when the fallback is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFallback;

#[async_trait]
impl FallbackResolver for DisabledFallback {
    async fn resolve(&self, _label: &Label, _missing: &ExtractionSchema, _document: &Path) -> FallbackOutcome {
        FallbackOutcome::Failed(FallbackFailure::Disabled)
    }
}
