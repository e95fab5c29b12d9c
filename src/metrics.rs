use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing request activity since startup.
#[derive(Default)]
pub struct RequestMetrics {
    ocr_requests: AtomicU64,
    pdfs_processed: AtomicU64,
    diagnoses_generated: AtomicU64,
    reports_rendered: AtomicU64,
    models_installed: AtomicU64,
}

impl RequestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed OCR request.
    pub fn record_ocr(&self) {
        self.ocr_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a PDF whose text was extracted.
    pub fn record_pdf(&self) {
        self.pdfs_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generated diagnosis.
    pub fn record_diagnosis(&self) {
        self.diagnoses_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rendered PDF report.
    pub fn record_report(&self) {
        self.reports_rendered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an installed model archive.
    pub fn record_model_install(&self) {
        self.models_installed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ocr_requests: self.ocr_requests.load(Ordering::Relaxed),
            pdfs_processed: self.pdfs_processed.load(Ordering::Relaxed),
            diagnoses_generated: self.diagnoses_generated.load(Ordering::Relaxed),
            reports_rendered: self.reports_rendered.load(Ordering::Relaxed),
            models_installed: self.models_installed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of request counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Images run through OCR.
    pub ocr_requests: u64,
    /// PDFs whose text was extracted.
    pub pdfs_processed: u64,
    /// Diagnoses produced by the language model.
    pub diagnoses_generated: u64,
    /// PDF reports rendered.
    pub reports_rendered: u64,
    /// Model archives installed.
    pub models_installed: u64,
}
