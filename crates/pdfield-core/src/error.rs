//! Error types for the pdfield-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pdfield library.
#[derive(Error, Debug)]
pub enum PdfieldError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Pattern bank or validator construction error.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// The job's document does not resolve to an existing regular file.
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    /// The job's path leaves the data root.
    #[error("document path escapes the data root: {}", .0.display())]
    DocumentOutsideRoot(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfieldError {
    /// Whether the error was caused by the caller's request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PdfieldError::DocumentNotFound(_) | PdfieldError::DocumentOutsideRoot(_)
        )
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors raised while building pattern banks and validators.
///
/// These are configuration errors: they surface when a bank is built, never
/// while a document is being extracted.
#[derive(Error, Debug)]
pub enum PatternError {
    /// A field pattern does not compile.
    #[error("invalid pattern for {field}: {reason}")]
    InvalidRegex { field: String, reason: String },

    /// A field pattern has no capture group to take the value from.
    #[error("pattern for {field} has no capture group: {pattern}")]
    MissingCaptureGroup { field: String, pattern: String },

    /// A validator declaration is unusable.
    #[error("invalid validator for {field}: {reason}")]
    InvalidValidator { field: String, reason: String },
}

/// Result type for the pdfield library.
pub type Result<T> = std::result::Result<T, PdfieldError>;
