//! HTTP surface for the medical document service.
//!
//! This module exposes an Axum router with the following endpoints:
//!
//! - `POST /api/upload-model` – Replace the model directory with an uploaded zip archive.
//! - `POST /api/ocr` – Extract text from an uploaded image with Tesseract.
//! - `POST /api/diagnosis` – Produce a SOAP report for extracted text via retrieval + LLM.
//! - `POST /api/generate-pdf` – Render a diagnosis and its source text as a PDF attachment.
//! - `POST /api/process-pdf` – Extract raw and section-annotated text from an uploaded PDF.
//! - `GET /api/metrics` – Request counters since startup.
//! - `GET /api/commands` – Machine-readable command catalog.
//! - `GET /health` – Qdrant reachability and collection presence.
//!
//! Every failure is reported as `{"success": false, "error": "..."}`; client mistakes map to
//! `400`, bodies over the upload limit to `413`, and everything else to `500`.

use crate::diagnosis::{DiagnosisError, DiagnosisReport};
use crate::knowledge::CorpusHealth;
use crate::logging::http_trace_layer;
use crate::metrics::MetricsSnapshot;
use crate::pdf::ReportInput;
use crate::service::{MedicalApi, ServiceError};
use crate::uploads::{UploadError, UploadKind, read_file_field};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;

const REPORT_FILE_NAME: &str = "diagnosis_report.pdf";

/// Build the HTTP router. Request bodies are capped at `max_upload_bytes`.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: MedicalApi + 'static,
{
    Router::new()
        .route("/api/upload-model", post(upload_model::<S>))
        .route("/api/ocr", post(process_image::<S>))
        .route("/api/diagnosis", post(get_diagnosis::<S>))
        .route("/api/generate-pdf", post(generate_pdf::<S>))
        .route("/api/process-pdf", post(process_pdf::<S>))
        .route("/api/metrics", get(get_metrics::<S>))
        .route("/api/commands", get(get_commands))
        .route("/health", get(health::<S>))
        .with_state(service)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(http_trace_layer())
        .layer(CorsLayer::permissive())
}

/// Success response for `POST /api/upload-model`.
#[derive(Serialize)]
struct UploadModelResponse {
    success: bool,
    message: &'static str,
    files_extracted: usize,
    sha256: String,
}

/// Replace the model directory with an uploaded zip archive.
async fn upload_model<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadModelResponse>, ApiError>
where
    S: MedicalApi,
{
    let mut multipart = multipart?;
    let upload = read_file_field(&mut multipart, UploadKind::ModelArchive).await?;
    let install = service.install_model(upload).await?;
    Ok(Json(UploadModelResponse {
        success: true,
        message: "Model uploaded and extracted successfully",
        files_extracted: install.files_extracted,
        sha256: install.sha256,
    }))
}

/// Success response for `POST /api/ocr`.
#[derive(Serialize)]
struct OcrResponse {
    success: bool,
    text: String,
}

/// Run OCR over an uploaded image.
async fn process_image<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError>
where
    S: MedicalApi,
{
    let mut multipart = multipart?;
    let upload = read_file_field(&mut multipart, UploadKind::Image).await?;
    let text = service.ocr_image(upload).await?;
    Ok(Json(OcrResponse {
        success: true,
        text,
    }))
}

/// Success response for `POST /api/diagnosis`.
#[derive(Serialize)]
struct DiagnosisResponse {
    success: bool,
    #[serde(flatten)]
    report: DiagnosisReport,
}

/// Produce a diagnosis for `{"text": "..."}`.
async fn get_diagnosis<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DiagnosisResponse>, ApiError>
where
    S: MedicalApi,
{
    let Json(payload) = payload?;
    let Some(text) = payload.get("text").and_then(Value::as_str) else {
        return Err(ApiError::BadRequest(DiagnosisError::EmptyInput.to_string()));
    };
    let report = service.diagnose(text).await?;
    tracing::info!(chars = text.len(), "Diagnosis request completed");
    Ok(Json(DiagnosisResponse {
        success: true,
        report,
    }))
}

/// The `diagnosisData` object accepted by `POST /api/generate-pdf`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosisData {
    disease: String,
    confidence: f64,
    severity: String,
    treatment: String,
    #[serde(default)]
    precautions: Vec<String>,
    #[serde(default)]
    additional_info: Option<String>,
}

/// Render a diagnosis report for `{diagnosisData, extractedText, patientName?}`.
async fn generate_pdf<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: MedicalApi,
{
    let Json(payload) = payload?;
    let (Some(diagnosis), Some(extracted_text)) = (
        payload.get("diagnosisData"),
        payload.get("extractedText").and_then(Value::as_str),
    ) else {
        return Err(ApiError::BadRequest("Missing required data".to_string()));
    };
    let diagnosis: DiagnosisData = serde_json::from_value(diagnosis.clone())
        .map_err(|error| ApiError::BadRequest(format!("Invalid diagnosisData: {error}")))?;

    let input = ReportInput {
        disease: diagnosis.disease,
        confidence: diagnosis.confidence,
        severity: diagnosis.severity,
        treatment: diagnosis.treatment,
        precautions: diagnosis.precautions,
        additional_info: diagnosis.additional_info,
        extracted_text: extracted_text.to_string(),
        patient_name: payload
            .get("patientName")
            .and_then(Value::as_str)
            .map(str::to_string),
        generated_at: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
    };
    let bytes = service.render_report(input).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Success response for `POST /api/process-pdf`.
#[derive(Serialize)]
struct ProcessPdfResponse {
    success: bool,
    text: String,
    raw_text: String,
    processed_text: String,
}

/// Extract text from an uploaded PDF.
async fn process_pdf<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessPdfResponse>, ApiError>
where
    S: MedicalApi,
{
    let mut multipart = multipart?;
    let upload = read_file_field(&mut multipart, UploadKind::Pdf).await?;
    let extracted = service.extract_pdf(upload).await?;
    Ok(Json(ProcessPdfResponse {
        success: true,
        text: extracted.raw_text.clone(),
        raw_text: extracted.raw_text,
        processed_text: extracted.processed_text,
    }))
}

/// Return request counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: MedicalApi,
{
    Json(service.metrics_snapshot())
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    qdrant: CorpusHealth,
}

/// Report vector store health; `503` when Qdrant is unreachable.
async fn health<S>(State(service): State<Arc<S>>) -> (StatusCode, Json<HealthResponse>)
where
    S: MedicalApi,
{
    let qdrant = service.health().await;
    let (code, status) = if qdrant.reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (code, Json(HealthResponse { status, qdrant }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /api/commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by clients.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload_model",
                method: "POST",
                path: "/api/upload-model",
                description: "Multipart `file` (*.zip). Replaces the model directory with the archive contents.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ocr",
                method: "POST",
                path: "/api/ocr",
                description: "Multipart `file` (png, jpg, jpeg, gif, tiff, bmp, webp). Returns { \"text\": string }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "diagnosis",
                method: "POST",
                path: "/api/diagnosis",
                description: "Retrieve similar lab records and consultations, then generate a SOAP report.",
                request_example: Some(json!({ "text": "Patient reports fever and productive cough for 3 days." })),
            },
            CommandDescriptor {
                name: "generate_pdf",
                method: "POST",
                path: "/api/generate-pdf",
                description: "Render a diagnosis and the extracted source text as a PDF attachment.",
                request_example: Some(json!({
                    "diagnosisData": {
                        "disease": "Medical Condition (AI Analysis)",
                        "confidence": 0.89,
                        "severity": "moderate",
                        "treatment": "Subjective: ...",
                        "precautions": ["Monitor symptoms closely"],
                        "additionalInfo": "Optional note"
                    },
                    "extractedText": "Text taken from the uploaded report",
                    "patientName": "Optional name"
                })),
            },
            CommandDescriptor {
                name: "process_pdf",
                method: "POST",
                path: "/api/process-pdf",
                description: "Multipart `file` (*.pdf). Returns { \"text\": string, \"raw_text\": string, \"processed_text\": string }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/metrics",
                description: "Return request counters since startup.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Report Qdrant reachability and whether both corpus collections exist.",
                request_example: None,
            },
        ],
    })
}

enum ApiError {
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::BadRequest(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        if matches!(error, ServiceError::Upload(UploadError::TooLarge)) {
            return ApiError::PayloadTooLarge(error.to_string());
        }
        let client_error = matches!(
            error,
            ServiceError::Upload(
                UploadError::NoFilePart
                    | UploadError::NoSelectedFile
                    | UploadError::NotAllowed
                    | UploadError::Multipart(_)
            ) | ServiceError::Diagnosis(DiagnosisError::EmptyInput)
        );
        if client_error {
            ApiError::BadRequest(error.to_string())
        } else {
            ApiError::Internal(error.to_string())
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        ServiceError::from(error).into()
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::diagnosis::{DiagnosisError, DiagnosisReport, Severity};
    use crate::knowledge::CorpusHealth;
    use crate::metrics::MetricsSnapshot;
    use crate::models::ModelInstall;
    use crate::ocr::OcrError;
    use crate::pdf::{PdfText, ReportInput};
    use crate::service::{MedicalApi, ServiceError};
    use crate::uploads::Upload;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, Response, StatusCode, header},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "meddiag-test-boundary";

    #[derive(Default)]
    struct StubMedicalService {
        uploads: Mutex<Vec<String>>,
        diagnosed: Mutex<Vec<String>>,
        reports: Mutex<Vec<ReportInput>>,
        ocr_fails: bool,
        reachable: bool,
    }

    #[async_trait]
    impl MedicalApi for StubMedicalService {
        async fn install_model(&self, upload: Upload) -> Result<ModelInstall, ServiceError> {
            self.uploads.lock().await.push(upload.file_name);
            Ok(ModelInstall {
                files_extracted: 3,
                sha256: "ab".repeat(32),
            })
        }

        async fn ocr_image(&self, upload: Upload) -> Result<String, ServiceError> {
            self.uploads.lock().await.push(upload.file_name);
            if self.ocr_fails {
                return Err(OcrError::EngineUnavailable("tesseract missing".into()).into());
            }
            Ok(String::from_utf8_lossy(&upload.bytes).into_owned())
        }

        async fn extract_pdf(&self, upload: Upload) -> Result<PdfText, ServiceError> {
            self.uploads.lock().await.push(upload.file_name);
            Ok(PdfText {
                raw_text: "Vitals stable".into(),
                processed_text: "### Vitals stable ###\n".into(),
                page_count: 1,
            })
        }

        async fn diagnose(&self, text: &str) -> Result<DiagnosisReport, ServiceError> {
            if text.trim().is_empty() {
                return Err(DiagnosisError::EmptyInput.into());
            }
            self.diagnosed.lock().await.push(text.to_string());
            Ok(DiagnosisReport {
                disease: "Medical Condition (AI Analysis)".into(),
                confidence: 0.89,
                severity: Severity::Moderate,
                treatment: "Subjective: cough".into(),
                precautions: vec!["Monitor symptoms closely".into()],
                additional_info: "AI generated".into(),
            })
        }

        async fn render_report(&self, input: ReportInput) -> Result<Vec<u8>, ServiceError> {
            self.reports.lock().await.push(input);
            Ok(b"%PDF-1.5 stub".to_vec())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                ocr_requests: 4,
                ..MetricsSnapshot::default()
            }
        }

        async fn health(&self) -> CorpusHealth {
            CorpusHealth {
                reachable: self.reachable,
                lab_collection_present: self.reachable,
                chatbot_collection_present: self.reachable,
                error: (!self.reachable).then(|| "connection refused".to_string()),
            }
        }
    }

    fn router(service: Arc<StubMedicalService>) -> Router {
        create_router(service, 1024 * 1024)
    }

    fn multipart_request(uri: &str, field: &str, file_name: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn json_request(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: Response<Body>) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn commands_catalog_lists_every_api_route() {
        let commands = get_commands().await.0.commands;
        let paths: Vec<&str> = commands.iter().map(|cmd| cmd.path).collect();

        for path in [
            "/api/upload-model",
            "/api/ocr",
            "/api/diagnosis",
            "/api/generate-pdf",
            "/api/process-pdf",
        ] {
            assert!(paths.contains(&path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn ocr_returns_extracted_text() {
        let service = Arc::new(StubMedicalService::default());
        let response = router(service.clone())
            .oneshot(multipart_request("/api/ocr", "file", "scan.PNG", b"WBC 7.1"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json, json!({ "success": true, "text": "WBC 7.1" }));
        assert_eq!(*service.uploads.lock().await, vec!["scan.PNG".to_string()]);
    }

    #[tokio::test]
    async fn upload_validation_errors_are_bad_requests() {
        let cases = [
            multipart_request("/api/ocr", "attachment", "scan.png", b"x"),
            multipart_request("/api/ocr", "file", "", b"x"),
            multipart_request("/api/ocr", "file", "scan.pdf", b"x"),
            multipart_request("/api/upload-model", "file", "model.tar", b"x"),
        ];
        let expected = [
            "No file part",
            "No selected file",
            "File type not allowed",
            "File type not allowed",
        ];

        for (request, message) in cases.into_iter().zip(expected) {
            let response = router(Arc::new(StubMedicalService::default()))
                .oneshot(request)
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await,
                json!({ "success": false, "error": message })
            );
        }
    }

    #[tokio::test]
    async fn engine_failures_are_internal_errors() {
        let service = Arc::new(StubMedicalService {
            ocr_fails: true,
            ..StubMedicalService::default()
        });
        let response = router(service)
            .oneshot(multipart_request("/api/ocr", "file", "scan.jpg", b"x"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().expect("error").contains("tesseract missing"));
    }

    #[tokio::test]
    async fn upload_model_reports_install_summary() {
        let response = router(Arc::new(StubMedicalService::default()))
            .oneshot(multipart_request("/api/upload-model", "file", "model.zip", b"PK"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Model uploaded and extracted successfully");
        assert_eq!(json["files_extracted"], 3);
    }

    #[tokio::test]
    async fn process_pdf_returns_raw_and_processed_text() {
        let response = router(Arc::new(StubMedicalService::default()))
            .oneshot(multipart_request("/api/process-pdf", "file", "labs.pdf", b"%PDF"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "success": true,
                "text": "Vitals stable",
                "raw_text": "Vitals stable",
                "processed_text": "### Vitals stable ###\n"
            })
        );
    }

    #[tokio::test]
    async fn oversized_bodies_are_payload_too_large() {
        let service = Arc::new(StubMedicalService::default());
        let image = vec![b'x'; 2 * 1024 * 1024];
        let response = router(service.clone())
            .oneshot(multipart_request("/api/ocr", "file", "scan.png", &image))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "error": "File too large" })
        );
        assert!(service.uploads.lock().await.is_empty());

        let text = "a".repeat(2 * 1024 * 1024);
        let response = router(service.clone())
            .oneshot(json_request("/api/diagnosis", json!({ "text": text }).to_string()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["success"], false);
        assert!(service.diagnosed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn diagnosis_flattens_report_fields() {
        let service = Arc::new(StubMedicalService::default());
        let response = router(service.clone())
            .oneshot(json_request(
                "/api/diagnosis",
                json!({ "text": "fever and cough" }).to_string(),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["severity"], "moderate");
        assert_eq!(json["additionalInfo"], "AI generated");
        assert_eq!(json["treatment"], "Subjective: cough");
        assert_eq!(*service.diagnosed.lock().await, vec!["fever and cough".to_string()]);
    }

    #[tokio::test]
    async fn diagnosis_without_text_is_rejected() {
        for body in [json!({}).to_string(), json!({ "text": "   " }).to_string()] {
            let response = router(Arc::new(StubMedicalService::default()))
                .oneshot(json_request("/api/diagnosis", body))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await,
                json!({ "success": false, "error": "No text provided" })
            );
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let response = router(Arc::new(StubMedicalService::default()))
            .oneshot(json_request("/api/diagnosis", "{not json".to_string()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn generate_pdf_returns_attachment() {
        let service = Arc::new(StubMedicalService::default());
        let payload = json!({
            "diagnosisData": {
                "disease": "Anemia",
                "confidence": 0.75,
                "severity": "low",
                "treatment": "Iron supplementation",
                "precautions": ["Recheck CBC in 4 weeks"]
            },
            "extractedText": "Hb 9.8 g/dL",
            "patientName": "Jane Doe"
        });
        let response = router(service.clone())
            .oneshot(json_request("/api/generate-pdf", payload.to_string()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"diagnosis_report.pdf\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert!(body.starts_with(b"%PDF"));

        let reports = service.reports.lock().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].disease, "Anemia");
        assert_eq!(reports[0].extracted_text, "Hb 9.8 g/dL");
        assert_eq!(reports[0].patient_name.as_deref(), Some("Jane Doe"));
        assert_eq!(reports[0].additional_info, None);
    }

    #[tokio::test]
    async fn generate_pdf_requires_diagnosis_and_text() {
        let response = router(Arc::new(StubMedicalService::default()))
            .oneshot(json_request(
                "/api/generate-pdf",
                json!({ "extractedText": "Hb 9.8" }).to_string(),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "error": "Missing required data" })
        );
    }

    #[tokio::test]
    async fn metrics_and_health_are_exposed() {
        let service = Arc::new(StubMedicalService::default());
        let app = router(service);

        let metrics = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(json_body(metrics).await["ocr_requests"], 4);

        let health = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(health).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["qdrant"]["error"], "connection refused");
    }
}
