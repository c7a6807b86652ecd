//! Core library for hybrid field extraction from PDF documents.
//!
//! This crate provides:
//! - PDF text reading (whole document and per page)
//! - Per-label pattern banks with validators
//! - The completion gate deciding when the fallback is consulted
//! - Merging of pattern and fallback results
//! - The request orchestrator running single jobs and fail-fast batches

pub mod error;
pub mod extraction;
pub mod models;
pub mod pdf;
pub mod pipeline;

pub use error::{PatternError, PdfError, PdfieldError, Result};
pub use extraction::rules::{LabelDefinition, LabelProfile, LabelRegistry, PatternBank, Validator, ValidatorSet};
pub use extraction::{CompletionGate, DeterministicExtractor, ResultMerger};
pub use models::{
    ExtractionJob, ExtractionMethod, ExtractionResult, ExtractionSchema, FieldValue, FieldValues, JobBatch, Label,
    PdfieldConfig,
};
pub use pdf::{DocumentReader, PdfExtractor, PdfProcessor, PdfTextReader};
pub use pipeline::{
    DisabledFallback, FallbackFailure, FallbackOutcome, FallbackResolver, JobReport, JobStage, RequestOrchestrator,
};
