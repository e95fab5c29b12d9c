//! Installation of uploaded model archives into the model directory.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Errors raised while installing a model archive.
#[derive(Debug, Error)]
pub enum ModelStoreError {
    /// The upload is not a readable zip archive.
    #[error("Invalid model archive: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),
    /// An entry would be written outside the model directory.
    #[error("Archive entry '{0}' escapes the model directory")]
    UnsafeEntry(String),
    /// Reading the archive or writing the model directory failed.
    #[error("Model directory I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The blocking worker failed.
    #[error("Model install worker failed: {0}")]
    Worker(String),
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInstall {
    /// Regular files now present in the model directory.
    pub files_extracted: usize,
    /// Hex SHA-256 of the uploaded archive.
    pub sha256: String,
}

/// Owns the directory holding the active model files.
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_dir: PathBuf,
}

impl ModelStore {
    /// Manage models under `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Replace the model directory contents with the entries of the zip at `archive_path`.
    ///
    /// The archive is fully validated before anything is deleted, so a bad upload leaves the
    /// current models in place.
    pub async fn install_archive(&self, archive_path: &Path) -> Result<ModelInstall, ModelStoreError> {
        let model_dir = self.model_dir.clone();
        let archive_path = archive_path.to_path_buf();
        tokio::task::spawn_blocking(move || install_blocking(&model_dir, &archive_path))
            .await
            .map_err(|error| ModelStoreError::Worker(error.to_string()))?
    }
}

fn install_blocking(model_dir: &Path, archive_path: &Path) -> Result<ModelInstall, ModelStoreError> {
    let sha256 = hash_file(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(File::open(archive_path)?))?;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.enclosed_name().is_none() {
            return Err(ModelStoreError::UnsafeEntry(entry.name().to_string()));
        }
    }

    if model_dir.exists() {
        std::fs::remove_dir_all(model_dir)?;
    }
    std::fs::create_dir_all(model_dir)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ModelStoreError::UnsafeEntry(entry.name().to_string()));
        };
        let target = model_dir.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&target)?;
        io::copy(&mut entry, &mut output)?;
    }

    let files_extracted = WalkDir::new(model_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count();

    tracing::info!(
        model_dir = %model_dir.display(),
        files_extracted,
        sha256 = %sha256,
        "Model archive installed"
    );
    Ok(ModelInstall {
        files_extracted,
        sha256,
    })
}

fn hash_file(path: &Path) -> Result<String, ModelStoreError> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
