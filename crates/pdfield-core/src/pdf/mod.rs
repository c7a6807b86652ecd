//! PDF text loading.

mod extractor;

pub use extractor::{PdfExtractor, PdfTextReader};

use std::path::Path;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for in-memory PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract text from a specific page (1-indexed).
    fn extract_page_text(&self, page: u32) -> Result<String>;
}

/// Reads plain text out of a document on disk.
///
/// Failures here are not recovered by the pipeline: they fail the job.
pub trait DocumentReader: Send + Sync {
    /// Text of all pages, concatenated in page order.
    fn read_text(&self, path: &Path) -> crate::Result<String>;

    /// Text per page, in page order. Readers that cannot split pages return
    /// the whole text as a single page.
    fn read_pages(&self, path: &Path) -> crate::Result<Vec<String>> {
        Ok(vec![self.read_text(path)?])
    }
}
