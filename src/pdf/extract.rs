//! Text extraction from uploaded PDFs.

use super::PdfError;
use std::panic::{AssertUnwindSafe, catch_unwind};

const SECTION_KEYWORDS: [&str; 7] = [
    "diagnosis",
    "assessment",
    "history",
    "medication",
    "symptoms",
    "vitals",
    "lab results",
];

/// Text pulled out of a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfText {
    /// All text with whitespace runs collapsed to single spaces.
    pub raw_text: String,
    /// Line-preserving text with medical section headers marked as `### header ###`.
    pub processed_text: String,
    /// Number of pages in the document.
    pub page_count: usize,
}

/// Extract text from PDF bytes on the blocking pool.
pub async fn extract_text(bytes: Vec<u8>) -> Result<PdfText, PdfError> {
    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes))
        .await
        .map_err(|error| PdfError::Worker(error.to_string()))?
}

fn extract_text_blocking(bytes: &[u8]) -> Result<PdfText, PdfError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|error| PdfError::Parse(error.to_string()))?;
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

    // pdf-extract panics on some malformed font programs.
    let primary = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
    let text = match primary {
        Ok(Ok(text)) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => {
            tracing::debug!("pdf-extract returned no text; trying lopdf");
            fallback_text(&document, &page_numbers)
        }
        Ok(Err(error)) => {
            tracing::warn!(error = %error, "pdf-extract failed; trying lopdf");
            fallback_text(&document, &page_numbers)
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked; trying lopdf");
            fallback_text(&document, &page_numbers)
        }
    };

    let text = text.replace('\0', "");
    tracing::info!(
        pages = page_numbers.len(),
        chars = text.len(),
        "PDF text extracted"
    );

    Ok(PdfText {
        raw_text: collapse_whitespace(&text),
        processed_text: annotate_medical_sections(&text),
        page_count: page_numbers.len(),
    })
}

fn fallback_text(document: &lopdf::Document, page_numbers: &[u32]) -> String {
    let mut text = String::new();
    for &page in page_numbers {
        match document.extract_text(&[page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push_str("\n\n");
            }
            Err(error) => tracing::debug!(page, error = %error, "No text on page"),
        }
    }
    if text.trim().is_empty() {
        tracing::warn!("PDF has no extractable text; it may be image-based");
    }
    text
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim lines, drop blank ones, and mark lines naming a medical report section.
pub fn annotate_medical_sections(text: &str) -> String {
    let mut formatted = String::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let lower = line.to_lowercase();
        if SECTION_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
            formatted.push_str("### ");
            formatted.push_str(line);
            formatted.push_str(" ###\n");
        } else {
            formatted.push_str(line);
            formatted.push('\n');
        }
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{ReportInput, render_report};

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(
            collapse_whitespace("  Patient:\tJane \n\n Doe  "),
            "Patient: Jane Doe"
        );
        assert_eq!(collapse_whitespace("\n\t "), "");
    }

    #[test]
    fn section_headers_are_marked() {
        let text = "  Patient: Jane Doe\n\nPast Medical History\n  asthma  \nLAB RESULTS\nHb 12";
        assert_eq!(
            annotate_medical_sections(text),
            "Patient: Jane Doe\n### Past Medical History ###\nasthma\n### LAB RESULTS ###\nHb 12\n"
        );
    }

    #[tokio::test]
    async fn garbage_bytes_are_a_parse_error() {
        let error = extract_text(b"not a pdf at all".to_vec())
            .await
            .expect_err("parse error");
        assert!(matches!(error, PdfError::Parse(_)));
    }

    #[tokio::test]
    async fn rendered_report_text_can_be_read_back() {
        let pdf = render_report(&ReportInput::sample()).expect("render");

        let text = extract_text(pdf).await.expect("extract");

        assert_eq!(text.page_count, 2);
        assert!(text.raw_text.contains("Medical Diagnosis Report"));
        assert!(!text.raw_text.contains("  "));
    }
}
