//! Image-to-text through the Tesseract OCR engine.
//!
//! Uploaded images are decoded first, so unreadable files fail fast with a clear error and
//! formats Tesseract handles poorly (WebP, GIF) are handed over as PNG.

use async_trait::async_trait;
use image::ImageFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors raised by OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The upload is not a decodable image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    /// The OCR executable is not installed or not on `PATH`.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
    /// The OCR engine ran and failed.
    #[error("OCR failed: {0}")]
    Failed(String),
    /// Staging the normalized image failed.
    #[error("OCR staging failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Interface implemented by OCR backends.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract the text printed in the image stored at `path`.
    async fn extract_text(&self, path: &Path) -> Result<String, OcrError>;
}

/// Runs the `tesseract` CLI as a subprocess.
pub struct TesseractOcr {
    command: String,
    language: String,
    scratch_dir: PathBuf,
}

impl TesseractOcr {
    /// Construct an engine invoking `command` with the `language` pack, staging PNGs under
    /// `scratch_dir`.
    pub fn new(
        command: impl Into<String>,
        language: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

/// Decode the upload and re-encode it as a grayscale PNG in `scratch_dir`.
fn normalize_to_png(path: &Path, scratch_dir: &Path) -> Result<tempfile::NamedTempFile, OcrError> {
    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|error| OcrError::InvalidImage(error.to_string()))?;
    let gray = image.to_luma8();
    let staged = tempfile::Builder::new()
        .prefix("ocr-")
        .suffix(".png")
        .tempfile_in(scratch_dir)?;
    gray.save_with_format(staged.path(), ImageFormat::Png)
        .map_err(|error| OcrError::Failed(format!("failed to stage PNG: {error}")))?;
    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        staged = %staged.path().display(),
        "Image normalized for OCR"
    );
    Ok(staged)
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
        let source = path.to_path_buf();
        let scratch_dir = self.scratch_dir.clone();
        let staged = tokio::task::spawn_blocking(move || normalize_to_png(&source, &scratch_dir))
            .await
            .map_err(|error| OcrError::Failed(format!("image decoding task failed: {error}")))??;

        let output = Command::new(&self.command)
            .arg(staged.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => OcrError::EngineUnavailable(format!(
                    "'{}' not found; install tesseract-ocr or set TESSERACT_COMMAND",
                    self.command
                )),
                _ => OcrError::Failed(format!("failed to run '{}': {error}", self.command)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::info!(chars = text.len(), "OCR completed");
        Ok(text)
    }
}
