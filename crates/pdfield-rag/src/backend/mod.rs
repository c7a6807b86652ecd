//! Embedding and chat backend implementations.

pub mod openai;

pub use openai::{OpenAiChat, OpenAiConfig, OpenAiEmbeddings};

use async_trait::async_trait;

use crate::{RagError, Result};

/// Turns text into dense vectors.
///
/// Document and query embeddings go through separate methods so backends
/// that embed queries differently can do so.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of document texts, one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a retrieval query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("no embedding returned for query".to_string()))
    }
}

/// Answers a single-turn prompt.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `prompt` as one user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
