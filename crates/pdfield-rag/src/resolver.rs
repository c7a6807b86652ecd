//! [`FallbackResolver`] backed by semantic retrieval and a chat model.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pdfield_core::models::config::FallbackConfig;
use pdfield_core::{
    DocumentReader, ExtractionSchema, FallbackFailure, FallbackOutcome, FallbackResolver, FieldValues, Label,
    PdfieldError,
};
use tracing::{debug, info, warn};

use crate::backend::{ChatBackend, EmbeddingBackend, OpenAiChat, OpenAiConfig, OpenAiEmbeddings};
use crate::cache::{IndexCache, SchemaCache};
use crate::chunker::SemanticChunker;
use crate::index::VectorIndex;
use crate::prompt::{build_prompt, parse_answer, retrieval_query};
use crate::{RagError, Result};

/// Chunks retrieved as context when not configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Resolves missing fields by retrieving relevant chunks of the document and
/// asking a chat model for a JSON answer.
pub struct RagResolver {
    reader: Arc<dyn DocumentReader>,
    embedder: Arc<dyn EmbeddingBackend>,
    chat: Arc<dyn ChatBackend>,
    chunker: SemanticChunker,
    top_k: usize,
    indexes: IndexCache,
    schemas: SchemaCache,
}

impl RagResolver {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        embedder: Arc<dyn EmbeddingBackend>,
        chat: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            reader,
            embedder,
            chat,
            chunker: SemanticChunker::default(),
            top_k: DEFAULT_TOP_K,
            indexes: IndexCache::new(),
            schemas: SchemaCache::new(),
        }
    }

    /// Resolver talking to the OpenAI-compatible API described by `config`.
    pub fn from_config(config: &FallbackConfig, reader: Arc<dyn DocumentReader>) -> Result<Self> {
        let api = OpenAiConfig::from_fallback(config)?;
        let embedder = OpenAiEmbeddings::new(api.clone(), &config.embedding_model)?;
        let chat = OpenAiChat::new(api, &config.chat_model, config.temperature)?;
        info!(
            "Fallback using {} (chat) and {} (embeddings) at {}",
            config.chat_model, config.embedding_model, config.api_base
        );

        Ok(Self::new(reader, Arc::new(embedder), Arc::new(chat))
            .with_top_k(config.top_k)
            .with_chunker(SemanticChunker::new(config.breakpoint_percentile)))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_chunker(mut self, chunker: SemanticChunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn index_cache(&self) -> &IndexCache {
        &self.indexes
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    async fn build_index(&self, document: &Path) -> Result<VectorIndex> {
        let reader = Arc::clone(&self.reader);
        let path = document.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || reader.read_pages(&path))
            .await
            .map_err(|e| PdfieldError::Io(std::io::Error::other(e)))??;

        let pages: Vec<String> = pages.into_iter().filter(|p| !p.trim().is_empty()).collect();
        if pages.is_empty() {
            return Err(RagError::EmptyDocument(document.to_path_buf()));
        }

        let index = VectorIndex::build(&pages, &self.chunker, self.embedder.as_ref()).await?;
        if index.is_empty() {
            return Err(RagError::EmptyDocument(document.to_path_buf()));
        }
        info!("Indexed {} ({} pages, {} chunks)", document.display(), pages.len(), index.len());
        Ok(index)
    }

    async fn ask(&self, index: &VectorIndex, missing: &ExtractionSchema) -> Result<FieldValues> {
        let query = self.embedder.embed_query(&retrieval_query(missing)).await?;
        let hits = index.search(&query, self.top_k);
        debug!("Retrieved {} chunk(s) for {} field(s)", hits.len(), missing.len());

        let context: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        let prompt = build_prompt(missing, &context)?;
        let answer = self.chat.complete(&prompt).await?;
        parse_answer(&answer, missing)
    }
}

/// Failure reported when building the index fails.
fn index_failure(err: RagError) -> FallbackFailure {
    match err {
        RagError::Document(e) => FallbackFailure::DocumentLoad(e.to_string()),
        e @ RagError::EmptyDocument(_) => FallbackFailure::DocumentLoad(e.to_string()),
        e => FallbackFailure::IndexBuild(e.to_string()),
    }
}

/// Failure reported when retrieval or generation fails.
fn query_failure(err: RagError) -> FallbackFailure {
    match err {
        RagError::MalformedAnswer(reason) => FallbackFailure::MalformedOutput(reason),
        e => FallbackFailure::Backend(e.to_string()),
    }
}

#[async_trait]
impl FallbackResolver for RagResolver {
    async fn resolve(&self, label: &Label, missing: &ExtractionSchema, document: &Path) -> FallbackOutcome {
        self.schemas.record(label, missing);
        if missing.is_empty() {
            return FallbackOutcome::Resolved(FieldValues::new());
        }

        let document = match document.canonicalize() {
            Ok(path) if path.is_file() => path,
            _ => {
                warn!("Fallback skipped, document not found: {}", document.display());
                return FallbackOutcome::Failed(FallbackFailure::DocumentNotFound(document.to_path_buf()));
            }
        };

        let path = document.as_path();
        let index = match self.indexes.get_or_try_build(path, move || self.build_index(path)).await {
            Ok(index) => index,
            Err(e) => {
                let failure = index_failure(e);
                warn!("Fallback indexing failed for {}: {}", document.display(), failure);
                return FallbackOutcome::Failed(failure);
            }
        };

        match self.ask(&index, missing).await {
            Ok(values) => {
                debug!("Fallback resolved {} field(s) for {}", values.len(), label);
                FallbackOutcome::Resolved(values)
            }
            Err(e) => {
                let failure = query_failure(e);
                warn!("Fallback query failed for {}: {}", document.display(), failure);
                FallbackOutcome::Failed(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Pages come from the file's text, split on form feeds.
    #[derive(Default)]
    struct CountingReader {
        reads: AtomicUsize,
    }

    impl DocumentReader for CountingReader {
        fn read_text(&self, path: &Path) -> pdfield_core::Result<String> {
            Ok(fs::read_to_string(path)?)
        }

        fn read_pages(&self, path: &Path) -> pdfield_core::Result<Vec<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.read_text(path)?.split('\x0c').map(str::to_string).collect())
        }
    }

    struct BrokenReader;

    impl DocumentReader for BrokenReader {
        fn read_text(&self, _path: &Path) -> pdfield_core::Result<String> {
            Err(PdfieldError::Pdf(pdfield_core::PdfError::Encrypted))
        }
    }

    /// Two-dimensional "embedding": does the text talk about names or not.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingBackend for KeywordEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.to_lowercase().contains("nome") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    struct ScriptedChat {
        answer: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(reason.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedChat {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            self.answer.clone().map_err(RagError::Chat)
        }
    }

    fn missing_name() -> ExtractionSchema {
        ExtractionSchema::new().with_field("nome", "Nome do advogado")
    }

    fn write_doc(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test]
    async fn test_resolves_from_retrieved_context() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_doc(dir.path(), "oab.pdf", "Nome: MARIA SILVA.\x0cBoleto de cobrança.");
        let chat = ScriptedChat::answering("```json\n{\"nome\": \"MARIA SILVA\", \"cpf\": \"1\"}\n```");
        let resolver = RagResolver::new(Arc::new(CountingReader::default()), Arc::new(KeywordEmbedder), chat.clone())
            .with_top_k(1);

        let outcome = resolver.resolve(&Label::from("carteira_oab"), &missing_name(), &doc).await;

        let expected: FieldValues = [("nome", Some("MARIA SILVA".to_string()))].into_iter().collect();
        assert_eq!(outcome, FallbackOutcome::Resolved(expected));

        let prompts = chat.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Nome: MARIA SILVA."));
        assert!(!prompts[0].contains("Boleto"));
    }

    #[tokio::test]
    async fn test_index_reused_across_requests() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_doc(dir.path(), "oab.pdf", "Nome: MARIA.");
        let reader = Arc::new(CountingReader::default());
        let resolver = RagResolver::new(reader.clone(), Arc::new(KeywordEmbedder), ScriptedChat::answering("{}"));
        let label = Label::from("carteira_oab");
        let missing = missing_name();

        let (a, b) = tokio::join!(
            resolver.resolve(&label, &missing, &doc),
            resolver.resolve(&label, &missing, &doc)
        );
        resolver.resolve(&label, &missing, &doc).await;

        assert!(!a.is_failure() && !b.is_failure());
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
        assert!(resolver.index_cache().contains(&doc.canonicalize().unwrap()));
    }

    #[tokio::test]
    async fn test_schema_cache_records_requests() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_doc(dir.path(), "oab.pdf", "Nome: MARIA.");
        let resolver = RagResolver::new(
            Arc::new(CountingReader::default()),
            Arc::new(KeywordEmbedder),
            ScriptedChat::answering("{}"),
        );
        let label = Label::from("carteira_oab");

        resolver.resolve(&label, &missing_name(), &doc).await;
        resolver
            .resolve(&label, &ExtractionSchema::new().with_field("seccional", "UF"), &doc)
            .await;

        let schema = resolver.schema_cache().get(&label).unwrap();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["nome", "seccional"]);
    }

    #[tokio::test]
    async fn test_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("gone.pdf");
        let resolver = RagResolver::new(
            Arc::new(CountingReader::default()),
            Arc::new(KeywordEmbedder),
            ScriptedChat::answering("{}"),
        );

        let outcome = resolver.resolve(&Label::from("x"), &missing_name(), &doc).await;
        assert_eq!(outcome, FallbackOutcome::Failed(FallbackFailure::DocumentNotFound(doc)));
    }

    #[tokio::test]
    async fn test_blank_document_fails_and_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_doc(dir.path(), "blank.pdf", "  \x0c \n");
        let reader = Arc::new(CountingReader::default());
        let resolver = RagResolver::new(reader.clone(), Arc::new(KeywordEmbedder), ScriptedChat::answering("{}"));

        let outcome = resolver.resolve(&Label::from("x"), &missing_name(), &doc).await;
        assert!(matches!(outcome.failure(), Some(FallbackFailure::DocumentLoad(_))));

        fs::write(&doc, "Nome: JOAO.").unwrap();
        let outcome = resolver.resolve(&Label::from("x"), &missing_name(), &doc).await;
        assert!(!outcome.is_failure());
        assert_eq!(reader.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreadable_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_doc(dir.path(), "locked.pdf", "%PDF");
        let resolver = RagResolver::new(Arc::new(BrokenReader), Arc::new(KeywordEmbedder), ScriptedChat::answering("{}"));

        let outcome = resolver.resolve(&Label::from("x"), &missing_name(), &doc).await;
        assert!(matches!(outcome.failure(), Some(FallbackFailure::DocumentLoad(_))));
    }

    #[tokio::test]
    async fn test_backend_and_malformed_failures() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_doc(dir.path(), "oab.pdf", "Nome: MARIA.");
        let label = Label::from("carteira_oab");

        let resolver = RagResolver::new(
            Arc::new(CountingReader::default()),
            Arc::new(KeywordEmbedder),
            ScriptedChat::failing("HTTP 500"),
        );
        let outcome = resolver.resolve(&label, &missing_name(), &doc).await;
        assert!(matches!(outcome.failure(), Some(FallbackFailure::Backend(_))));

        let resolver = RagResolver::new(
            Arc::new(CountingReader::default()),
            Arc::new(KeywordEmbedder),
            ScriptedChat::answering("O nome é MARIA."),
        );
        let outcome = resolver.resolve(&label, &missing_name(), &doc).await;
        assert!(matches!(outcome.failure(), Some(FallbackFailure::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn test_nothing_missing_skips_backends() {
        let chat = ScriptedChat::failing("unused");
        let resolver = RagResolver::new(Arc::new(BrokenReader), Arc::new(KeywordEmbedder), chat.clone());

        let outcome = resolver
            .resolve(&Label::from("x"), &ExtractionSchema::new(), Path::new("/nope.pdf"))
            .await;
        assert_eq!(outcome, FallbackOutcome::Resolved(FieldValues::new()));
        assert!(chat.prompts.lock().is_empty());
    }
}
