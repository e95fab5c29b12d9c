//! Corpus documents and their mapping to and from Qdrant payloads.

use serde::Serialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// The two medical corpora backing retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusKind {
    /// Individual MIMIC-IV lab test records.
    LabTests,
    /// Patient questions paired with doctor answers.
    ChatbotTranscripts,
}

impl CorpusKind {
    /// Both corpora in retrieval order.
    pub const ALL: [CorpusKind; 2] = [CorpusKind::LabTests, CorpusKind::ChatbotTranscripts];

    /// Hugging Face dataset identifier the corpus is seeded from.
    pub fn dataset(self) -> &'static str {
        match self {
            CorpusKind::LabTests => "leowei31/MIMIC_IV_lab_test_individual",
            CorpusKind::ChatbotTranscripts => "ruslanmv/ai-medical-chatbot",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            CorpusKind::LabTests => "mimic",
            CorpusKind::ChatbotTranscripts => "chatbot",
        }
    }

    /// Map one dataset row into a document. Rows missing the content fields are skipped.
    pub fn document_from_row(self, index: usize, row: &Map<String, Value>) -> Option<KnowledgeDocument> {
        let id = format!("{}_{index}", self.id_prefix());
        match self {
            CorpusKind::LabTests => {
                let input = row_str(row, "input")?;
                let mut metadata = Map::new();
                metadata.insert("source".into(), json!(row_str(row, "target").unwrap_or_default()));
                Some(KnowledgeDocument {
                    id,
                    page_content: input.to_string(),
                    metadata,
                })
            }
            CorpusKind::ChatbotTranscripts => {
                let patient = row_str(row, "Patient")?;
                let doctor = row_str(row, "Doctor")?;
                let mut metadata = Map::new();
                metadata.insert(
                    "query".into(),
                    json!(row_str(row, "Description").unwrap_or_default()),
                );
                metadata.insert("patient_notes".into(), json!(patient));
                metadata.insert("Doctor".into(), json!(doctor));
                Some(KnowledgeDocument {
                    id,
                    page_content: format!("Symptoms: {patient}\nDoctor's Notes: {doctor}"),
                    metadata,
                })
            }
        }
    }
}

impl std::fmt::Display for CorpusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusKind::LabTests => f.write_str("lab_tests"),
            CorpusKind::ChatbotTranscripts => f.write_str("chatbot_transcripts"),
        }
    }
}

fn row_str<'a>(row: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

/// A document as stored in the vector database: embedded text plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeDocument {
    /// Stable dataset-derived identifier such as `mimic_12`.
    pub id: String,
    /// Text that gets embedded and handed to the LLM as context.
    pub page_content: String,
    /// Dataset-specific metadata.
    pub metadata: Map<String, Value>,
}

impl KnowledgeDocument {
    /// Deterministic Qdrant point id, so re-seeding overwrites rather than duplicates.
    pub fn point_id(&self) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, self.id.as_bytes()).to_string()
    }

    /// Payload persisted next to the vector.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("doc_id".into(), json!(self.id));
        payload.insert("page_content".into(), json!(self.page_content));
        payload.insert("metadata".into(), Value::Object(self.metadata.clone()));
        payload
    }
}

/// Document returned by a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    /// Dataset-derived identifier, or the point id when the payload lacks one.
    pub id: String,
    /// Similarity score reported by the vector store.
    pub score: f32,
    /// Stored document text.
    pub page_content: String,
    /// Stored metadata.
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    /// Rebuild a document from a scored Qdrant point.
    pub fn from_point(point: crate::qdrant::ScoredPoint) -> Self {
        let mut payload = point.payload.unwrap_or_default();
        let id = match payload.remove("doc_id") {
            Some(Value::String(id)) => id,
            _ => point.id,
        };
        let page_content = match payload.remove("page_content") {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        let metadata = match payload.remove("metadata") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            id,
            score: point.score,
            page_content,
            metadata,
        }
    }
}

/// Render retrieved documents as a prompt context block.
pub fn format_context(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return "(no matching records)".to_string();
    }

    documents
        .iter()
        .map(|doc| {
            let metadata = doc
                .metadata
                .iter()
                .map(|(key, value)| match value {
                    Value::String(text) => format!("{key}: {text}"),
                    other => format!("{key}: {other}"),
                })
                .collect::<Vec<_>>()
                .join("; ");
            if metadata.is_empty() {
                format!("[{}]\n{}", doc.id, doc.page_content)
            } else {
                format!("[{}] ({metadata})\n{}", doc.id, doc.page_content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::ScoredPoint;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn lab_rows_keep_target_as_source() {
        let doc = CorpusKind::LabTests
            .document_from_row(
                4,
                &row(json!({ "input": "Potassium 6.1 mmol/L", "target": "hyperkalemia" })),
            )
            .expect("document");

        assert_eq!(doc.id, "mimic_4");
        assert_eq!(doc.page_content, "Potassium 6.1 mmol/L");
        assert_eq!(doc.metadata["source"], json!("hyperkalemia"));
    }

    #[test]
    fn chatbot_rows_combine_symptoms_and_notes() {
        let doc = CorpusKind::ChatbotTranscripts
            .document_from_row(
                0,
                &row(json!({
                    "Description": "Q. Why do I feel dizzy?",
                    "Patient": "Dizzy for two days",
                    "Doctor": "Check blood pressure"
                })),
            )
            .expect("document");

        assert_eq!(doc.id, "chatbot_0");
        assert_eq!(
            doc.page_content,
            "Symptoms: Dizzy for two days\nDoctor's Notes: Check blood pressure"
        );
        assert_eq!(doc.metadata["query"], json!("Q. Why do I feel dizzy?"));
        assert_eq!(doc.metadata["patient_notes"], json!("Dizzy for two days"));
        assert_eq!(doc.metadata["Doctor"], json!("Check blood pressure"));
    }

    #[test]
    fn rows_without_content_are_skipped() {
        assert!(
            CorpusKind::LabTests
                .document_from_row(0, &row(json!({ "target": "x" })))
                .is_none()
        );
        assert!(
            CorpusKind::ChatbotTranscripts
                .document_from_row(0, &row(json!({ "Patient": "only patient" })))
                .is_none()
        );
    }

    #[test]
    fn point_ids_are_stable_per_document() {
        let doc = KnowledgeDocument {
            id: "mimic_1".into(),
            page_content: "a".into(),
            metadata: Map::new(),
        };
        let other = KnowledgeDocument {
            id: "mimic_2".into(),
            ..doc.clone()
        };
        assert_eq!(doc.point_id(), doc.clone().point_id());
        assert_ne!(doc.point_id(), other.point_id());
    }

    #[test]
    fn payload_survives_retrieval_mapping() {
        let mut metadata = Map::new();
        metadata.insert("source".into(), json!("anemia"));
        let doc = KnowledgeDocument {
            id: "mimic_9".into(),
            page_content: "Hemoglobin 8.0".into(),
            metadata,
        };

        let retrieved = RetrievedDocument::from_point(ScoredPoint {
            id: doc.point_id(),
            score: 0.7,
            payload: Some(doc.to_payload()),
        });

        assert_eq!(retrieved.id, "mimic_9");
        assert_eq!(retrieved.page_content, "Hemoglobin 8.0");
        assert_eq!(retrieved.metadata["source"], json!("anemia"));
        assert_eq!(
            format_context(&[retrieved]),
            "[mimic_9] (source: anemia)\nHemoglobin 8.0"
        );
    }

    #[test]
    fn empty_context_is_explicit() {
        assert_eq!(format_context(&[]), "(no matching records)");
    }
}
