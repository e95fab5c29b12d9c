//! Retrieval-augmented SOAP report generation.
//!
//! A diagnosis is one retrieval per corpus followed by one LLM completion. Only the
//! `treatment` field carries generated text; the remaining report fields are fixed values
//! attached to every AI-produced report.

mod prompt;

pub use prompt::{PromptInputs, render_prompt};

use crate::knowledge::{CorpusKind, KnowledgeError, Retriever, format_context};
use crate::llm::{GenerationClient, GenerationClientError, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const AI_DISEASE_LABEL: &str = "Medical Condition (AI Analysis)";
const AI_CONFIDENCE: f32 = 0.89;
const AI_ADDITIONAL_INFO: &str =
    "This diagnosis is based on AI analysis of your medical report and similar cases.";
const STANDARD_PRECAUTIONS: [&str; 4] = [
    "Follow the recommended treatment plan",
    "Monitor symptoms closely",
    "Schedule follow-up appointments as advised",
    "Report any significant changes in condition",
];

/// Errors raised while producing a diagnosis.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// The request carried no usable text.
    #[error("No text provided")]
    EmptyInput,
    /// Retrieval against the corpus failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] KnowledgeError),
    /// The LLM call failed.
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationClientError),
}

/// Coarse severity attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low severity.
    Low,
    /// Moderate severity.
    Moderate,
    /// High severity.
    High,
}

/// Report returned by the diagnosis endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    /// Condition label.
    pub disease: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Severity label.
    pub severity: Severity,
    /// Full generated SOAP report.
    pub treatment: String,
    /// Follow-up instructions.
    pub precautions: Vec<String>,
    /// Free-form note about how the report was produced.
    pub additional_info: String,
}

impl DiagnosisReport {
    fn from_generated(treatment: String) -> Self {
        Self {
            disease: AI_DISEASE_LABEL.to_string(),
            confidence: AI_CONFIDENCE,
            severity: Severity::Moderate,
            treatment,
            precautions: STANDARD_PRECAUTIONS.iter().map(|p| p.to_string()).collect(),
            additional_info: AI_ADDITIONAL_INFO.to_string(),
        }
    }
}

/// Couples retrieval and generation.
pub struct DiagnosisService {
    retriever: Arc<dyn Retriever>,
    generator: Box<dyn GenerationClient + Send + Sync>,
    model: String,
    top_k: usize,
}

impl DiagnosisService {
    /// Build a service that retrieves `top_k` documents per corpus and generates with `model`.
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Box<dyn GenerationClient + Send + Sync>,
        model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            model: model.into(),
            top_k,
        }
    }

    /// Produce a SOAP report for the extracted patient text.
    pub async fn diagnose(&self, text: &str) -> Result<DiagnosisReport, DiagnosisError> {
        if text.trim().is_empty() {
            return Err(DiagnosisError::EmptyInput);
        }

        let lab_docs = self
            .retriever
            .retrieve(CorpusKind::LabTests, text, self.top_k)
            .await?;
        let chatbot_docs = self
            .retriever
            .retrieve(CorpusKind::ChatbotTranscripts, text, self.top_k)
            .await?;
        tracing::info!(
            lab_hits = lab_docs.len(),
            chatbot_hits = chatbot_docs.len(),
            "Context retrieved for diagnosis"
        );

        let lab_context = format_context(&lab_docs);
        let chatbot_context = format_context(&chatbot_docs);
        let prompt = render_prompt(PromptInputs {
            patient_input: text,
            retrieved_context_1: &lab_context,
            retrieved_context_2: &chatbot_context,
        });

        let treatment = self
            .generator
            .generate(GenerationRequest {
                model: self.model.clone(),
                prompt,
            })
            .await?;
        tracing::debug!(chars = treatment.len(), "SOAP report generated");

        Ok(DiagnosisReport::from_generated(treatment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::RetrievedDocument;
    use async_trait::async_trait;
    use serde_json::{Map, json};
    use tokio::sync::Mutex;

    struct CannedRetriever;

    #[async_trait]
    impl Retriever for CannedRetriever {
        async fn retrieve(
            &self,
            corpus: CorpusKind,
            _text: &str,
            k: usize,
        ) -> Result<Vec<RetrievedDocument>, KnowledgeError> {
            assert_eq!(k, 3);
            let (id, content) = match corpus {
                CorpusKind::LabTests => ("mimic_1", "Troponin elevated"),
                CorpusKind::ChatbotTranscripts => ("chatbot_5", "Symptoms: chest pain"),
            };
            Ok(vec![RetrievedDocument {
                id: id.into(),
                score: 0.8,
                page_content: content.into(),
                metadata: Map::new(),
            }])
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationClient for Arc<RecordingGenerator> {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<String, GenerationClientError> {
            self.prompts.lock().await.push(request);
            Ok("Subjective:\n- chest pain".into())
        }
    }

    #[tokio::test]
    async fn diagnosis_uses_both_corpora_and_fixed_fields() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = DiagnosisService::new(
            Arc::new(CannedRetriever),
            Box::new(generator.clone()),
            "mistral",
            3,
        );

        let report = service.diagnose("Chest pain since morning").await.expect("report");

        assert_eq!(report.treatment, "Subjective:\n- chest pain");
        assert_eq!(report.severity, Severity::Moderate);
        assert_eq!(report.precautions.len(), 4);

        let prompts = generator.prompts.lock().await;
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].model, "mistral");
        assert!(prompts[0].prompt.contains("Chest pain since morning"));
        assert!(prompts[0].prompt.contains("Troponin elevated"));
        assert!(prompts[0].prompt.contains("Symptoms: chest pain"));

        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["severity"], json!("moderate"));
        assert_eq!(json["disease"], json!("Medical Condition (AI Analysis)"));
        assert!(json["additionalInfo"].as_str().is_some());
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_retrieval() {
        let service = DiagnosisService::new(
            Arc::new(CannedRetriever),
            Box::new(Arc::new(RecordingGenerator::default())),
            "mistral",
            3,
        );

        let error = service.diagnose("   \n").await.expect_err("blank");
        assert!(matches!(error, DiagnosisError::EmptyInput));
    }
}
