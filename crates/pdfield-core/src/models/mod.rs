//! Data models: jobs, results, field values and configuration.

pub mod config;
pub mod field;
pub mod job;

pub use config::PdfieldConfig;
pub use field::{FieldValue, FieldValues};
pub use job::{
    format_elapsed, ExtractionJob, ExtractionMethod, ExtractionResult, ExtractionSchema, JobBatch, Label,
    SchemaField,
};
