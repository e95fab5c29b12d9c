//! Medical corpus stored in Qdrant: seeding from public datasets and similarity retrieval.

mod datasets;
mod document;

pub use datasets::{DatasetSource, HuggingFaceRows, JsonlFiles};
pub use document::{CorpusKind, KnowledgeDocument, RetrievedDocument, format_context};

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::qdrant::{PointInsert, QdrantError, QdrantService};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

const EMBED_BATCH_SIZE: usize = 64;

/// Errors raised while seeding or querying the corpus.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Embedding provider failed.
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store request failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Dataset rows could not be fetched or parsed.
    #[error("Dataset error: {0}")]
    Dataset(String),
    /// Local dataset file could not be read.
    #[error("Dataset file error: {0}")]
    Io(#[from] std::io::Error),
    /// Embedding provider returned no vector for the query.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Similarity search over a corpus.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the `k` documents most similar to `text`.
    async fn retrieve(
        &self,
        corpus: CorpusKind,
        text: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, KnowledgeError>;
}

/// Collection names for each corpus.
#[derive(Debug, Clone)]
pub struct CorpusCollections {
    /// Collection holding lab-test records.
    pub lab_tests: String,
    /// Collection holding chatbot transcripts.
    pub chatbot_transcripts: String,
}

impl CorpusCollections {
    /// Collection backing the given corpus.
    pub fn name(&self, corpus: CorpusKind) -> &str {
        match corpus {
            CorpusKind::LabTests => &self.lab_tests,
            CorpusKind::ChatbotTranscripts => &self.chatbot_transcripts,
        }
    }
}

/// Outcome of seeding one corpus.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    /// Corpus that was considered.
    pub corpus: CorpusKind,
    /// Collection that backs the corpus.
    pub collection: String,
    /// Documents written during this run.
    pub documents_indexed: usize,
    /// Points already present when seeding was skipped.
    pub existing_points: u64,
}

/// Reachability of the vector store and presence of both collections.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusHealth {
    /// Whether Qdrant answered.
    pub reachable: bool,
    /// Whether the lab-test collection exists.
    pub lab_collection_present: bool,
    /// Whether the chatbot collection exists.
    pub chatbot_collection_present: bool,
    /// Diagnostic string captured when Qdrant is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owns the embedding client and vector store handle shared by seeding and retrieval.
pub struct KnowledgeBase {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    qdrant: QdrantService,
    collections: CorpusCollections,
    vector_size: u64,
}

impl KnowledgeBase {
    /// Assemble a knowledge base over existing clients.
    pub fn new(
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        qdrant: QdrantService,
        collections: CorpusCollections,
        vector_size: u64,
    ) -> Self {
        Self {
            embedding_client,
            qdrant,
            collections,
            vector_size,
        }
    }

    /// Create any missing collection, then load every corpus whose collection is empty.
    ///
    /// With `force`, corpora are re-seeded even when they already hold points; deterministic
    /// point ids make that an overwrite.
    pub async fn seed_if_empty(
        &self,
        source: &dyn DatasetSource,
        max_rows: usize,
        force: bool,
    ) -> Result<Vec<SeedReport>, KnowledgeError> {
        let mut reports = Vec::with_capacity(CorpusKind::ALL.len());
        for corpus in CorpusKind::ALL {
            let collection = self.collections.name(corpus).to_string();
            self.qdrant
                .create_collection_if_not_exists(&collection, self.vector_size)
                .await?;
            let existing_points = self.qdrant.count_points(&collection).await?;

            if existing_points > 0 && !force {
                tracing::info!(
                    %corpus,
                    collection = %collection,
                    existing_points,
                    "Loading existing vector collection"
                );
                reports.push(SeedReport {
                    corpus,
                    collection,
                    documents_indexed: 0,
                    existing_points,
                });
                continue;
            }

            tracing::info!(%corpus, collection = %collection, max_rows, "Seeding vector collection");
            let documents_indexed = self.seed_corpus(corpus, source, max_rows).await?;
            reports.push(SeedReport {
                corpus,
                collection,
                documents_indexed,
                existing_points,
            });
        }
        Ok(reports)
    }

    /// Fetch, embed, and upsert one corpus. Returns the number of documents written.
    pub async fn seed_corpus(
        &self,
        corpus: CorpusKind,
        source: &dyn DatasetSource,
        max_rows: usize,
    ) -> Result<usize, KnowledgeError> {
        let collection = self.collections.name(corpus);
        let rows = source.fetch_rows(corpus, max_rows).await?;
        let documents: Vec<KnowledgeDocument> = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| corpus.document_from_row(index, row))
            .collect();
        let skipped = rows.len() - documents.len();
        if skipped > 0 {
            tracing::warn!(%corpus, skipped, "Dataset rows missing content fields were skipped");
        }

        let mut written = 0;
        for batch in documents.chunks(EMBED_BATCH_SIZE) {
            let texts = batch.iter().map(|doc| doc.page_content.clone()).collect();
            let vectors = self.embedding_client.generate_embeddings(texts).await?;
            let points = batch
                .iter()
                .zip(vectors)
                .map(|(doc, vector)| PointInsert {
                    id: doc.point_id(),
                    vector,
                    payload: doc.to_payload(),
                })
                .collect();
            written += self.qdrant.upsert_points(collection, points).await?.upserted;
            tracing::debug!(%corpus, written, total = documents.len(), "Seed batch stored");
        }

        tracing::info!(%corpus, collection, documents = written, "Corpus seeded");
        Ok(written)
    }

    /// Embed `text` and return the `k` most similar documents from the corpus.
    pub async fn retrieve(
        &self,
        corpus: CorpusKind,
        text: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, KnowledgeError> {
        let collection = self.collections.name(corpus);
        let vector = self
            .embedding_client
            .generate_embeddings(vec![text.to_string()])
            .await?
            .pop()
            .ok_or(KnowledgeError::EmptyEmbedding)?;

        let hits = self.qdrant.search_points(collection, vector, k).await?;
        tracing::debug!(%corpus, collection, hits = hits.len(), "Retrieved documents");
        Ok(hits.into_iter().map(RetrievedDocument::from_point).collect())
    }

    /// Probe Qdrant for reachability and collection presence.
    pub async fn health(&self) -> CorpusHealth {
        match self.qdrant.list_collections().await {
            Ok(names) => CorpusHealth {
                reachable: true,
                lab_collection_present: names.contains(&self.collections.lab_tests),
                chatbot_collection_present: names
                    .contains(&self.collections.chatbot_transcripts),
                error: None,
            },
            Err(error) => {
                tracing::warn!(error = %error, "Qdrant health probe failed");
                CorpusHealth {
                    reachable: false,
                    lab_collection_present: false,
                    chatbot_collection_present: false,
                    error: Some(error.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn retrieve(
        &self,
        corpus: CorpusKind,
        text: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, KnowledgeError> {
        KnowledgeBase::retrieve(self, corpus, text, k).await
    }
}
