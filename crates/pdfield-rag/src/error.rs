//! Error types for the fallback resolver.

use std::path::PathBuf;

use pdfield_core::PdfieldError;
use thiserror::Error;

/// Errors that can occur while indexing a document or querying the backends.
#[derive(Error, Debug)]
pub enum RagError {
    /// The embedding endpoint failed or returned something unusable.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The chat endpoint failed or returned something unusable.
    #[error("chat completion failed: {0}")]
    Chat(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing API key, bad base URL and similar.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document yielded no text to index.
    #[error("document has no text: {}", .0.display())]
    EmptyDocument(PathBuf),

    /// Reading the document failed.
    #[error("document error: {0}")]
    Document(#[from] PdfieldError),

    /// The model's answer is not a JSON object.
    #[error("malformed answer: {0}")]
    MalformedAnswer(String),

    /// JSON encoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
