//! Per-job orchestration: patterns, completion gate, fallback, merge.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::fallback::{FallbackOutcome, FallbackResolver};
use crate::error::{PdfieldError, Result};
use crate::extraction::rules::LabelRegistry;
use crate::extraction::{CompletionGate, DeterministicExtractor, ResultMerger};
use crate::models::{format_elapsed, ExtractionJob, ExtractionMethod, ExtractionResult};
use crate::pdf::DocumentReader;

/// Stages a job passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    DeterministicDone,
    /// Nothing requested is missing; the fallback is skipped.
    Complete,
    /// At least one requested field is missing.
    Escalated,
    FallbackDone,
    Merged,
    Responded,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Received => "received",
            JobStage::DeterministicDone => "deterministic_done",
            JobStage::Complete => "complete",
            JobStage::Escalated => "escalated",
            JobStage::FallbackDone => "fallback_done",
            JobStage::Merged => "merged",
            JobStage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Everything known about one finished job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub result: ExtractionResult,
    /// Stages visited, in order.
    pub stages: Vec<JobStage>,
    /// Fallback outcome when the job escalated.
    pub fallback: Option<FallbackOutcome>,
}

/// Drives jobs through the hybrid pipeline.
pub struct RequestOrchestrator {
    registry: Arc<LabelRegistry>,
    reader: Arc<dyn DocumentReader>,
    fallback: Arc<dyn FallbackResolver>,
    data_root: PathBuf,
    confined: bool,
    extractor: DeterministicExtractor,
    gate: CompletionGate,
    merger: ResultMerger,
}

impl RequestOrchestrator {
    pub fn new(
        registry: Arc<LabelRegistry>,
        reader: Arc<dyn DocumentReader>,
        fallback: Arc<dyn FallbackResolver>,
        data_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            reader,
            fallback,
            data_root: data_root.into(),
            confined: false,
            extractor: DeterministicExtractor::new(),
            gate: CompletionGate::new(),
            merger: ResultMerger::new(),
        }
    }

    /// Only accept job paths that stay inside the data root: no absolute
    /// paths, no `..`, and no symlinks pointing out of it.
    pub fn confined_to_data_root(mut self) -> Self {
        self.confined = true;
        self
    }

    pub fn is_confined(&self) -> bool {
        self.confined
    }

    pub fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Resolve a job path against the data root. Absolute paths are kept as
    /// they are unless the orchestrator is confined.
    pub fn resolve_document(&self, pdf_path: &str) -> Result<PathBuf> {
        let relative = Path::new(pdf_path);
        if self.confined && !relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(PdfieldError::DocumentOutsideRoot(relative.to_path_buf()));
        }

        let full_path = self.data_root.join(relative);
        debug!("Resolved document path: {}", full_path.display());

        if !full_path.is_file() {
            return Err(PdfieldError::DocumentNotFound(full_path));
        }
        if self.confined {
            let root = self.data_root.canonicalize()?;
            if !full_path.canonicalize()?.starts_with(&root) {
                return Err(PdfieldError::DocumentOutsideRoot(full_path));
            }
        }
        Ok(full_path)
    }

    /// Run jobs in order. The first job that fails aborts the batch and no
    /// results are returned.
    pub async fn run_batch(&self, jobs: &[ExtractionJob]) -> Result<Vec<ExtractionResult>> {
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            results.push(self.run_job(job).await?);
        }
        Ok(results)
    }

    /// Run one job.
    pub async fn run_job(&self, job: &ExtractionJob) -> Result<ExtractionResult> {
        self.run_job_report(job).await.map(|report| report.result)
    }

    /// Run one job, keeping the stage trail and the fallback outcome.
    pub async fn run_job_report(&self, job: &ExtractionJob) -> Result<JobReport> {
        let start = Instant::now();
        let mut stages = vec![JobStage::Received];

        let document = self.resolve_document(&job.pdf_path)?;
        info!("Processing {} as {}", document.display(), job.label);

        let text = self.read_text(&document).await?;
        let profile = self.registry.profile_or_empty(&job.label);
        let deterministic = self.extractor.extract_profile(&text, &profile);
        advance(&mut stages, JobStage::DeterministicDone);

        let (merged, method, fallback) = if self.gate.is_complete(&deterministic, &job.extraction_schema) {
            advance(&mut stages, JobStage::Complete);
            let values = self.merger.restrict(&deterministic, &job.extraction_schema);
            (values, ExtractionMethod::Regex, None)
        } else {
            advance(&mut stages, JobStage::Escalated);
            let missing = self.gate.missing_fields(&deterministic, &job.extraction_schema);
            debug!(
                "Escalating {} field(s): {}",
                missing.len(),
                missing.field_names().collect::<Vec<_>>().join(", ")
            );

            let outcome = self.fallback.resolve(&job.label, &missing, &document).await;
            if let Some(reason) = outcome.failure() {
                warn!("Fallback failed for {}: {}", document.display(), reason);
            }
            advance(&mut stages, JobStage::FallbackDone);

            let values = self
                .merger
                .merge_for(&deterministic, &outcome.clone().into_values(), &job.extraction_schema);
            (values, ExtractionMethod::Mixed, Some(outcome))
        };
        advance(&mut stages, JobStage::Merged);

        let elapsed = start.elapsed();
        let result = ExtractionResult {
            label: job.label.clone(),
            extraction_schema: merged,
            pdf_path: file_name(&job.pdf_path),
            extracao_com: method,
            tempo_de_extracao: format_elapsed(elapsed),
            elapsed,
        };
        advance(&mut stages, JobStage::Responded);

        info!(
            "Finished {} via {} in {}ms",
            result.pdf_path,
            method,
            elapsed.as_millis()
        );

        Ok(JobReport {
            result,
            stages,
            fallback,
        })
    }

    /// Text extraction is CPU bound; keep it off the async workers.
    async fn read_text(&self, document: &Path) -> Result<String> {
        let reader = Arc::clone(&self.reader);
        let path = document.to_path_buf();
        tokio::task::spawn_blocking(move || reader.read_text(&path))
            .await
            .map_err(|e| PdfieldError::Io(std::io::Error::other(e)))?
    }
}

fn advance(stages: &mut Vec<JobStage>, next: JobStage) {
    debug!("Job stage -> {}", next);
    stages.push(next);
}

/// Final path component of a job path.
fn file_name(pdf_path: &str) -> String {
    Path::new(pdf_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::models::{ExtractionSchema, FieldValues, Label};
    use crate::pipeline::fallback::FallbackFailure;

    /// Treats the "PDF" as UTF-8 text.
    struct PlainTextReader;

    impl DocumentReader for PlainTextReader {
        fn read_text(&self, path: &Path) -> Result<String> {
            Ok(fs::read_to_string(path)?)
        }
    }

    struct StubFallback {
        outcome: FallbackOutcome,
        calls: Mutex<Vec<(Label, Vec<String>, PathBuf)>>,
    }

    impl StubFallback {
        fn new(outcome: FallbackOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Label, Vec<String>, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FallbackResolver for StubFallback {
        async fn resolve(&self, label: &Label, missing: &ExtractionSchema, document: &Path) -> FallbackOutcome {
            self.calls.lock().unwrap().push((
                label.clone(),
                missing.field_names().map(str::to_string).collect(),
                document.to_path_buf(),
            ));
            self.outcome.clone()
        }
    }

    fn orchestrator(root: &Path, fallback: Arc<StubFallback>) -> RequestOrchestrator {
        RequestOrchestrator::new(
            Arc::new(LabelRegistry::with_builtins().unwrap()),
            Arc::new(PlainTextReader),
            fallback,
            root,
        )
    }

    struct UnreadableReader;

    impl DocumentReader for UnreadableReader {
        fn read_text(&self, _path: &Path) -> Result<String> {
            Err(crate::error::PdfError::TextExtraction("corrupt stream".to_string()).into())
        }
    }

    fn oab_schema() -> ExtractionSchema {
        ExtractionSchema::new()
            .with_field("nome", "Nome do advogado")
            .with_field("inscricao", "Número de inscrição")
    }

    fn resolved(entries: &[(&str, Option<&str>)]) -> FallbackOutcome {
        FallbackOutcome::Resolved(entries.iter().map(|(k, v)| (*k, v.map(str::to_string))).collect())
    }

    #[tokio::test]
    async fn test_complete_job_is_regex_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("oab.pdf"), "Nome: MARIA SILVA\nInscrição: 123456\n").unwrap();
        let fallback = StubFallback::new(resolved(&[]));

        let report = orchestrator(dir.path(), fallback.clone())
            .run_job_report(&ExtractionJob::new("carteira_oab", oab_schema(), "oab.pdf"))
            .await
            .unwrap();

        assert_eq!(report.result.extracao_com, ExtractionMethod::Regex);
        assert_eq!(report.result.extraction_schema.get("nome"), Some("MARIA SILVA"));
        assert_eq!(report.result.extraction_schema.get("inscricao"), Some("123456"));
        assert_eq!(
            report.stages,
            vec![
                JobStage::Received,
                JobStage::DeterministicDone,
                JobStage::Complete,
                JobStage::Merged,
                JobStage::Responded,
            ]
        );
        assert!(report.fallback.is_none());
        assert!(fallback.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_name_escalates_only_that_field() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("oab.pdf"), "Inscrição: 123456").unwrap();
        let fallback = StubFallback::new(resolved(&[("nome", Some("MARIA SILVA"))]));

        let report = orchestrator(dir.path(), fallback.clone())
            .run_job_report(&ExtractionJob::new("carteira_oab", oab_schema(), "oab.pdf"))
            .await
            .unwrap();

        assert_eq!(report.result.extracao_com, ExtractionMethod::Mixed);
        let expected: FieldValues = [
            ("nome", Some("MARIA SILVA".to_string())),
            ("inscricao", Some("123456".to_string())),
        ]
        .into_iter()
        .collect();
        assert_eq!(report.result.extraction_schema, expected);

        let calls = fallback.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["nome".to_string()]);
        assert_eq!(calls[0].2, dir.path().join("oab.pdf"));
        assert!(report.stages.contains(&JobStage::Escalated));
        assert!(report.stages.contains(&JobStage::FallbackDone));
    }

    #[tokio::test]
    async fn test_mixed_even_when_fallback_resolves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("oab.pdf"), "Inscrição: 123456").unwrap();
        let fallback = StubFallback::new(resolved(&[("nome", None)]));

        let result = orchestrator(dir.path(), fallback)
            .run_job(&ExtractionJob::new("carteira_oab", oab_schema(), "oab.pdf"))
            .await
            .unwrap();

        assert_eq!(result.extracao_com, ExtractionMethod::Mixed);
        assert_eq!(result.extraction_schema.slot("nome"), Some(&None));
    }

    #[tokio::test]
    async fn test_fallback_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("oab.pdf"), "Inscrição: 123456").unwrap();
        let failure = FallbackFailure::Backend("connection refused".to_string());
        let fallback = StubFallback::new(FallbackOutcome::Failed(failure.clone()));

        let report = orchestrator(dir.path(), fallback)
            .run_job_report(&ExtractionJob::new("carteira_oab", oab_schema(), "oab.pdf"))
            .await
            .unwrap();

        assert_eq!(report.result.extracao_com, ExtractionMethod::Mixed);
        assert_eq!(report.result.extraction_schema.get("inscricao"), Some("123456"));
        assert_eq!(report.result.extraction_schema.get("nome"), None);
        assert_eq!(report.fallback.as_ref().and_then(|o| o.failure()), Some(&failure));
    }

    #[tokio::test]
    async fn test_result_restricted_to_schema_and_basename() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("oab")).unwrap();
        fs::write(dir.path().join("oab/card.pdf"), "Seccional: SP\nInscrição: 123456\nNome: JOAO\n").unwrap();
        let schema = ExtractionSchema::new()
            .with_field("seccional", "UF")
            .with_field("inscricao", "Número");

        let result = orchestrator(dir.path(), StubFallback::new(resolved(&[])))
            .run_job(&ExtractionJob::new("carteira_oab", schema, "oab/card.pdf"))
            .await
            .unwrap();

        let fields: Vec<&str> = result.extraction_schema.fields().collect();
        assert_eq!(fields, vec!["seccional", "inscricao"]);
        assert_eq!(result.pdf_path, "card.pdf");
        assert_eq!(result.tempo_de_extracao, "00:00:00");
    }

    #[tokio::test]
    async fn test_unknown_label_escalates_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.pdf"), "Nome: MARIA").unwrap();
        let fallback = StubFallback::new(resolved(&[]));

        let result = orchestrator(dir.path(), fallback.clone())
            .run_job(&ExtractionJob::new("desconhecido", oab_schema(), "doc.pdf"))
            .await
            .unwrap();

        assert_eq!(result.extracao_com, ExtractionMethod::Mixed);
        assert_eq!(fallback.calls()[0].1, vec!["nome".to_string(), "inscricao".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_document_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = orchestrator(dir.path(), StubFallback::new(resolved(&[])))
            .run_job(&ExtractionJob::new("carteira_oab", oab_schema(), "nope.pdf"))
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert!(matches!(err, PdfieldError::DocumentNotFound(p) if p == dir.path().join("nope.pdf")));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();
        let err = orchestrator(dir.path(), StubFallback::new(resolved(&[])))
            .resolve_document("folder.pdf")
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_reader_failure_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("oab.pdf"), "%PDF-1.4").unwrap();
        let orchestrator = RequestOrchestrator::new(
            Arc::new(LabelRegistry::with_builtins().unwrap()),
            Arc::new(UnreadableReader),
            StubFallback::new(resolved(&[])),
            dir.path(),
        );

        let err = orchestrator
            .run_job(&ExtractionJob::new("carteira_oab", oab_schema(), "oab.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfieldError::Pdf(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_unconfined_accepts_absolute_path() {
        let root = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let doc = other.path().join("outside.pdf");
        fs::write(&doc, "Nome: MARIA").unwrap();

        let resolved_path = orchestrator(root.path(), StubFallback::new(resolved(&[])))
            .resolve_document(doc.to_str().unwrap())
            .unwrap();
        assert_eq!(resolved_path, doc);
    }

    #[test]
    fn test_confined_rejects_paths_leaving_the_root() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("data");
        fs::create_dir(&root).unwrap();
        fs::write(parent.path().join("secret.pdf"), "Nome: MARIA").unwrap();
        let orchestrator = orchestrator(&root, StubFallback::new(resolved(&[]))).confined_to_data_root();
        let absolute = parent.path().join("secret.pdf");

        for path in ["../secret.pdf", "sub/../../secret.pdf", absolute.to_str().unwrap()] {
            let err = orchestrator.resolve_document(path).unwrap_err();
            assert!(matches!(err, PdfieldError::DocumentOutsideRoot(_)), "{path}");
            assert!(err.is_client_error());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_confined_rejects_symlink_out_of_root() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("data");
        fs::create_dir(&root).unwrap();
        fs::write(parent.path().join("secret.pdf"), "Nome: MARIA").unwrap();
        std::os::unix::fs::symlink(parent.path().join("secret.pdf"), root.join("link.pdf")).unwrap();

        let err = orchestrator(&root, StubFallback::new(resolved(&[])))
            .confined_to_data_root()
            .resolve_document("link.pdf")
            .unwrap_err();
        assert!(matches!(err, PdfieldError::DocumentOutsideRoot(_)));
    }

    #[test]
    fn test_confined_accepts_nested_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("oab")).unwrap();
        fs::write(dir.path().join("oab/card.pdf"), "Nome: MARIA").unwrap();
        let orchestrator = orchestrator(dir.path(), StubFallback::new(resolved(&[]))).confined_to_data_root();

        assert!(orchestrator.is_confined());
        assert_eq!(
            orchestrator.resolve_document("./oab/card.pdf").unwrap(),
            dir.path().join("./oab/card.pdf")
        );
        assert!(matches!(
            orchestrator.resolve_document("oab/missing.pdf").unwrap_err(),
            PdfieldError::DocumentNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_batch_fails_fast_on_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("first.pdf"), "Nome: MARIA\nInscrição: 123456\n").unwrap();
        let fallback = StubFallback::new(resolved(&[]));
        let jobs = vec![
            ExtractionJob::new("carteira_oab", oab_schema(), "first.pdf"),
            ExtractionJob::new("carteira_oab", oab_schema(), "second.pdf"),
            ExtractionJob::new("carteira_oab", oab_schema(), "first.pdf"),
        ];

        let err = orchestrator(dir.path(), fallback).run_batch(&jobs).await.unwrap_err();
        assert!(matches!(err, PdfieldError::DocumentNotFound(p) if p.ends_with("second.pdf")));
    }

    #[tokio::test]
    async fn test_batch_keeps_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), "Nome: ANA\nInscrição: 111111\n").unwrap();
        fs::write(dir.path().join("b.pdf"), "Produto: Consignado\n").unwrap();
        let jobs = vec![
            ExtractionJob::new("tela_sistema", ExtractionSchema::new().with_field("produto", "Produto"), "b.pdf"),
            ExtractionJob::new("carteira_oab", oab_schema(), "a.pdf"),
        ];

        let results = orchestrator(dir.path(), StubFallback::new(resolved(&[])))
            .run_batch(&jobs)
            .await
            .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.pdf_path.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
        assert_eq!(results[0].extraction_schema.get("produto"), Some("Consignado"));
    }
}
