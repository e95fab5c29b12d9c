//! PDF text extraction and diagnosis report rendering.

mod extract;
mod layout;
mod report;

pub use extract::{PdfText, annotate_medical_sections, collapse_whitespace, extract_text};
pub use report::{ReportInput, render_report};

use thiserror::Error;

/// Errors raised while reading or writing PDFs.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The upload could not be parsed as a PDF.
    #[error("Failed to read PDF: {0}")]
    Parse(String),
    /// The report could not be serialized.
    #[error("Failed to render PDF: {0}")]
    Render(String),
    /// The blocking worker running the PDF job failed.
    #[error("PDF worker failed: {0}")]
    Worker(String),
}
