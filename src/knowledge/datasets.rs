//! Sources of raw dataset rows used to seed the corpora.

use super::{CorpusKind, KnowledgeError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

const ROWS_PAGE_SIZE: usize = 100;

/// Something that can hand back raw rows for a corpus.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Return up to `max_rows` rows of the corpus' training split, in dataset order.
    async fn fetch_rows(
        &self,
        corpus: CorpusKind,
        max_rows: usize,
    ) -> Result<Vec<Map<String, Value>>, KnowledgeError>;
}

/// Pages through the Hugging Face datasets server `/rows` API.
pub struct HuggingFaceRows {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    #[serde(default)]
    num_rows_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: Map<String, Value>,
}

impl HuggingFaceRows {
    /// Construct a source against the datasets server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, KnowledgeError> {
        let http = Client::builder()
            .user_agent("meddiag/seed")
            .build()
            .map_err(|error| KnowledgeError::Dataset(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rows", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DatasetSource for HuggingFaceRows {
    async fn fetch_rows(
        &self,
        corpus: CorpusKind,
        max_rows: usize,
    ) -> Result<Vec<Map<String, Value>>, KnowledgeError> {
        let dataset = corpus.dataset();
        let mut rows = Vec::new();

        while rows.len() < max_rows {
            let offset = rows.len();
            let length = ROWS_PAGE_SIZE.min(max_rows - offset);
            let response = self
                .http
                .get(self.endpoint())
                .query(&[
                    ("dataset", dataset),
                    ("config", "default"),
                    ("split", "train"),
                ])
                .query(&[("offset", offset), ("length", length)])
                .send()
                .await
                .map_err(|error| {
                    KnowledgeError::Dataset(format!("failed to reach datasets server: {error}"))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(KnowledgeError::Dataset(format!(
                    "datasets server returned {status} for {dataset}: {body}"
                )));
            }

            let page: RowsPage = response.json().await.map_err(|error| {
                KnowledgeError::Dataset(format!("malformed rows page for {dataset}: {error}"))
            })?;
            if page.rows.is_empty() {
                break;
            }
            rows.extend(page.rows.into_iter().map(|entry| entry.row));
            tracing::debug!(dataset, fetched = rows.len(), "Fetched dataset rows");

            if page.num_rows_total.is_some_and(|total| rows.len() >= total) {
                break;
            }
        }

        rows.truncate(max_rows);
        Ok(rows)
    }
}

/// Reads rows from local JSON Lines exports, one file per corpus.
pub struct JsonlFiles {
    lab_tests: PathBuf,
    chatbot_transcripts: PathBuf,
}

impl JsonlFiles {
    /// Point each corpus at its export file.
    pub fn new(lab_tests: impl Into<PathBuf>, chatbot_transcripts: impl Into<PathBuf>) -> Self {
        Self {
            lab_tests: lab_tests.into(),
            chatbot_transcripts: chatbot_transcripts.into(),
        }
    }

    fn path(&self, corpus: CorpusKind) -> &PathBuf {
        match corpus {
            CorpusKind::LabTests => &self.lab_tests,
            CorpusKind::ChatbotTranscripts => &self.chatbot_transcripts,
        }
    }
}

#[async_trait]
impl DatasetSource for JsonlFiles {
    async fn fetch_rows(
        &self,
        corpus: CorpusKind,
        max_rows: usize,
    ) -> Result<Vec<Map<String, Value>>, KnowledgeError> {
        let path = self.path(corpus);
        let contents = tokio::fs::read_to_string(path).await?;
        let mut rows = Vec::new();

        for (line_number, line) in contents.lines().enumerate() {
            if rows.len() >= max_rows {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|error| {
                KnowledgeError::Dataset(format!(
                    "{}:{}: {error}",
                    path.display(),
                    line_number + 1
                ))
            })?;
            match value {
                Value::Object(row) => rows.push(row),
                _ => {
                    return Err(KnowledgeError::Dataset(format!(
                        "{}:{}: expected a JSON object",
                        path.display(),
                        line_number + 1
                    )));
                }
            }
        }

        Ok(rows)
    }
}
