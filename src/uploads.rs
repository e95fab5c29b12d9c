//! Transient multipart uploads: validation, filename sanitizing, and staging on disk.

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Name of the multipart field every upload endpoint reads.
pub const FILE_FIELD: &str = "file";

/// The kinds of files the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Scanned reports for OCR.
    Image,
    /// Text PDFs.
    Pdf,
    /// Zipped model directories.
    ModelArchive,
}

impl UploadKind {
    /// Lowercase extensions accepted for this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => &["png", "jpg", "jpeg", "gif", "tiff", "bmp", "webp"],
            UploadKind::Pdf => &["pdf"],
            UploadKind::ModelArchive => &["zip"],
        }
    }
}

/// Errors raised while receiving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request has no `file` field.
    #[error("No file part")]
    NoFilePart,
    /// The `file` field has an empty filename.
    #[error("No selected file")]
    NoSelectedFile,
    /// The filename extension is not accepted for this endpoint.
    #[error("File type not allowed")]
    NotAllowed,
    /// The request body exceeds the configured upload limit.
    #[error("File too large")]
    TooLarge,
    /// The multipart body could not be read.
    #[error("Invalid multipart body: {0}")]
    Multipart(String),
    /// Staging the upload on disk failed.
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return UploadError::TooLarge;
        }
        UploadError::Multipart(error.body_text())
    }
}

/// A received file field.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Filename as sent by the client.
    pub file_name: String,
    /// File contents.
    pub bytes: Bytes,
}

/// True when `name` has an extension accepted for `kind`.
pub fn allowed_file(name: &str, kind: UploadKind) -> bool {
    name.rsplit_once('.').is_some_and(|(_, extension)| {
        let extension = extension.to_ascii_lowercase();
        kind.extensions().contains(&extension.as_str())
    })
}

/// Reduce a client filename to a safe single path component.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|ch| match ch {
            ch if ch.is_whitespace() => Some('_'),
            ch if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') => Some(ch),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Read the `file` field of a multipart request and validate its name for `kind`.
pub async fn read_file_field(
    multipart: &mut Multipart,
    kind: UploadKind,
) -> Result<Upload, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(UploadError::NoSelectedFile);
        }
        if !allowed_file(&file_name, kind) {
            tracing::debug!(file_name = %file_name, ?kind, "Rejected upload extension");
            return Err(UploadError::NotAllowed);
        }
        let bytes = field.bytes().await?;
        tracing::debug!(file_name = %file_name, bytes = bytes.len(), ?kind, "Upload received");
        return Ok(Upload { file_name, bytes });
    }
    Err(UploadError::NoFilePart)
}

/// Write an upload into `dir`. The file is deleted when the returned handle drops.
pub async fn stage_upload(dir: &Path, upload: &Upload) -> Result<NamedTempFile, UploadError> {
    let dir: PathBuf = dir.to_path_buf();
    let suffix = format!("-{}", secure_filename(&upload.file_name));
    let bytes = upload.bytes.clone();
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dir)?;
        let mut staged = tempfile::Builder::new()
            .prefix("upload")
            .suffix(&suffix)
            .tempfile_in(&dir)?;
        staged.write_all(&bytes)?;
        staged.flush()?;
        Ok::<_, UploadError>(staged)
    })
    .await
    .map_err(|error| UploadError::Io(std::io::Error::other(error)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive_and_needs_a_dot() {
        assert!(allowed_file("scan.PNG", UploadKind::Image));
        assert!(allowed_file("archive.tar.zip", UploadKind::ModelArchive));
        assert!(allowed_file("labs.pdf", UploadKind::Pdf));
        assert!(!allowed_file("pdf", UploadKind::Pdf));
        assert!(!allowed_file("scan.pdf", UploadKind::Image));
        assert!(!allowed_file("scan.", UploadKind::Image));
    }

    #[test]
    fn filenames_are_reduced_to_one_safe_component() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\lab report.pdf"), "lab_report.pdf");
        assert_eq!(secure_filename(".hidden.png"), "hidden.png");
        assert_eq!(secure_filename("résumé (1).jpg"), "rsum_1.jpg");
    }

    #[tokio::test]
    async fn staged_upload_is_removed_on_drop() {
        let dir = tempfile::tempdir().expect("dir");
        let upload = Upload {
            file_name: "../scan 1.png".to_string(),
            bytes: Bytes::from_static(b"pixels"),
        };

        let staged = stage_upload(dir.path(), &upload).await.expect("stage");
        let path = staged.path().to_path_buf();

        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().ends_with("-scan_1.png"));
        assert_eq!(std::fs::read(&path).expect("read"), b"pixels");

        drop(staged);
        assert!(!path.exists());
    }
}
