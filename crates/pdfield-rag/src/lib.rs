//! Retrieval-augmented fallback for fields the pattern pass could not find.
//!
//! Documents are split into semantically coherent chunks, embedded into an
//! in-memory index (built once per document and cached), and the chunks most
//! relevant to the missing fields are handed to a chat model together with a
//! JSON-only extraction prompt.

pub mod backend;
mod cache;
mod chunker;
mod error;
mod index;
mod prompt;
mod resolver;

pub use backend::{ChatBackend, EmbeddingBackend, OpenAiChat, OpenAiConfig, OpenAiEmbeddings};
pub use cache::{IndexCache, SchemaCache};
pub use chunker::{Chunk, SemanticChunker};
pub use error::RagError;
pub use index::{cosine_similarity, ScoredChunk, VectorIndex};
pub use prompt::{build_prompt, parse_answer, retrieval_query};
pub use resolver::RagResolver;

/// Result type for fallback operations.
pub type Result<T> = std::result::Result<T, RagError>;
