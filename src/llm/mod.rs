//! Text generation through the local LLM runtime.
//!
//! The Ollama-backed client mirrors the embedding adapter by issuing HTTP requests directly to
//! the runtime's `/api/generate` endpoint with streaming disabled.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while generating text.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was unreachable or the endpoint does not exist.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the generation provider.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
}

/// Interface implemented by text generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Run a single completion and return the generated text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError>;
}

/// Build the generation client for the configured Ollama runtime.
pub fn get_generation_client() -> Result<Box<dyn GenerationClient + Send + Sync>, GenerationClientError>
{
    let config = get_config();
    Ok(Box::new(OllamaGenerationClient::new(config.ollama_url.clone())?))
}

/// Generation client for the Ollama `/api/generate` endpoint.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
}

impl OllamaGenerationClient {
    /// Construct a client targeting the runtime at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GenerationClientError> {
        let http = Client::builder()
            .user_agent("meddiag/generate")
            .build()
            .map_err(|error| GenerationClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Requesting completion"
        );
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404: {body}",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "mistral".into(),
            prompt: "Write a SOAP note".into(),
        }
    }

    #[tokio::test]
    async fn returns_trimmed_completion() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{ "model": "mistral", "stream": false }"#);
                then.status(200).json_body(json!({
                    "response": "\nSubjective:\n- headache\n",
                    "done": true
                }));
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url()).expect("client");
        let text = client.generate(request()).await.expect("completion");

        mock.assert();
        assert_eq!(text, "Subjective:\n- headache");
    }

    #[tokio::test]
    async fn error_status_maps_to_generation_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("model crashed");
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url()).expect("client");
        let error = client.generate(request()).await.expect_err("error");

        assert!(
            matches!(error, GenerationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn missing_endpoint_is_reported_as_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body("model 'mistral' not found");
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url()).expect("client");
        let error = client.generate(request()).await.expect_err("error");

        assert!(matches!(error, GenerationClientError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url()).expect("client");
        let error = client.generate(request()).await.expect_err("error");

        assert!(matches!(error, GenerationClientError::InvalidResponse(_)));
    }
}
