//! Service layer shared by the HTTP surface: uploads, OCR, PDFs, diagnosis, and model installs.

use crate::{
    config::{Config, get_config},
    diagnosis::{DiagnosisError, DiagnosisReport, DiagnosisService},
    embedding::{EmbeddingClientError, get_embedding_client},
    knowledge::{CorpusCollections, CorpusHealth, HuggingFaceRows, KnowledgeBase, KnowledgeError},
    llm::{GenerationClientError, get_generation_client},
    metrics::{MetricsSnapshot, RequestMetrics},
    models::{ModelInstall, ModelStore, ModelStoreError},
    ocr::{OcrEngine, OcrError, TesseractOcr},
    pdf::{self, PdfError, PdfText, ReportInput},
    qdrant::{QdrantError, QdrantService},
    uploads::{Upload, UploadError, stage_upload},
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by [`MedicalApi`] operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upload was missing, misnamed, or could not be staged.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// Installing a model archive failed.
    #[error(transparent)]
    Model(#[from] ModelStoreError),
    /// OCR failed.
    #[error(transparent)]
    Ocr(#[from] OcrError),
    /// Reading or writing a PDF failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Producing a diagnosis failed.
    #[error(transparent)]
    Diagnosis(#[from] DiagnosisError),
    /// Corpus seeding failed during startup.
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    /// The embedding client could not be built.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The generation client could not be built.
    #[error(transparent)]
    Generation(#[from] GenerationClientError),
    /// The Qdrant client could not be built.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
}

/// Abstraction over the medical pipeline used by the HTTP surface.
#[async_trait]
pub trait MedicalApi: Send + Sync {
    /// Replace the model directory with the contents of an uploaded zip.
    async fn install_model(&self, upload: Upload) -> Result<ModelInstall, ServiceError>;

    /// Run OCR over an uploaded image.
    async fn ocr_image(&self, upload: Upload) -> Result<String, ServiceError>;

    /// Extract raw and section-annotated text from an uploaded PDF.
    async fn extract_pdf(&self, upload: Upload) -> Result<PdfText, ServiceError>;

    /// Produce a SOAP diagnosis for extracted report text.
    async fn diagnose(&self, text: &str) -> Result<DiagnosisReport, ServiceError>;

    /// Render a diagnosis report as PDF bytes.
    async fn render_report(&self, input: ReportInput) -> Result<Vec<u8>, ServiceError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Probe the vector store.
    async fn health(&self) -> CorpusHealth;
}

/// Owns every engine behind the HTTP surface. Build once at startup and share through an `Arc`.
pub struct MedicalService {
    knowledge: Arc<KnowledgeBase>,
    diagnosis: DiagnosisService,
    ocr: Box<dyn OcrEngine>,
    models: ModelStore,
    upload_dir: PathBuf,
    metrics: RequestMetrics,
}

/// Build the knowledge base described by `config`.
pub fn knowledge_base_from_config(config: &Config) -> Result<KnowledgeBase, ServiceError> {
    let embedding_client = get_embedding_client()?;
    let qdrant = QdrantService::new()?;
    Ok(KnowledgeBase::new(
        embedding_client,
        qdrant,
        CorpusCollections {
            lab_tests: config.lab_collection_name.clone(),
            chatbot_transcripts: config.chatbot_collection_name.clone(),
        },
        config.embedding_dimension as u64,
    ))
}

impl MedicalService {
    /// Build the service from configuration, seeding empty collections when enabled.
    pub async fn new() -> Result<Self, ServiceError> {
        let config = get_config();
        let knowledge = Arc::new(knowledge_base_from_config(config)?);

        if config.seed_on_startup {
            let source = HuggingFaceRows::new(config.hf_datasets_url.clone())?;
            let reports = knowledge
                .seed_if_empty(&source, config.seed_max_rows, false)
                .await?;
            for report in &reports {
                tracing::info!(
                    corpus = %report.corpus,
                    collection = %report.collection,
                    documents_indexed = report.documents_indexed,
                    existing_points = report.existing_points,
                    "Corpus ready"
                );
            }
        } else {
            tracing::info!("Startup seeding disabled; using collections as-is");
        }

        let diagnosis = DiagnosisService::new(
            knowledge.clone(),
            get_generation_client()?,
            config.llm_model.clone(),
            config.retrieval_top_k,
        );
        let ocr = TesseractOcr::new(
            config.tesseract_command.clone(),
            config.ocr_language.clone(),
            config.upload_dir.clone(),
        );

        Ok(Self::with_components(
            knowledge,
            diagnosis,
            Box::new(ocr),
            ModelStore::new(config.model_dir.clone()),
            config.upload_dir.clone(),
        ))
    }

    /// Assemble a service from already-built parts.
    pub fn with_components(
        knowledge: Arc<KnowledgeBase>,
        diagnosis: DiagnosisService,
        ocr: Box<dyn OcrEngine>,
        models: ModelStore,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            knowledge,
            diagnosis,
            ocr,
            models,
            upload_dir,
            metrics: RequestMetrics::new(),
        }
    }
}

#[async_trait]
impl MedicalApi for MedicalService {
    async fn install_model(&self, upload: Upload) -> Result<ModelInstall, ServiceError> {
        let staged = stage_upload(&self.upload_dir, &upload).await?;
        let install = self.models.install_archive(staged.path()).await?;
        self.metrics.record_model_install();
        Ok(install)
    }

    async fn ocr_image(&self, upload: Upload) -> Result<String, ServiceError> {
        let staged = stage_upload(&self.upload_dir, &upload).await?;
        let text = self.ocr.extract_text(staged.path()).await?;
        self.metrics.record_ocr();
        Ok(text)
    }

    async fn extract_pdf(&self, upload: Upload) -> Result<PdfText, ServiceError> {
        let text = pdf::extract_text(upload.bytes.to_vec()).await?;
        self.metrics.record_pdf();
        Ok(text)
    }

    async fn diagnose(&self, text: &str) -> Result<DiagnosisReport, ServiceError> {
        let report = self.diagnosis.diagnose(text).await?;
        self.metrics.record_diagnosis();
        Ok(report)
    }

    async fn render_report(&self, input: ReportInput) -> Result<Vec<u8>, ServiceError> {
        let bytes = pdf::render_report(&input)?;
        self.metrics.record_report();
        Ok(bytes)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn health(&self) -> CorpusHealth {
        self.knowledge.health().await
    }
}
