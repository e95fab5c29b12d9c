//! Shared types used by the Qdrant client.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Prepared point ready for upsert.
#[derive(Debug, Clone)]
pub struct PointInsert {
    /// Point identifier (UUID string).
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// JSON payload stored alongside the vector.
    pub payload: Map<String, Value>,
}

/// Summary of an upsert call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    /// Number of points written.
    pub upserted: usize,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score.
    pub score: f32,
    /// Stored payload, if requested and present.
    pub payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListCollectionsResponse {
    pub(crate) result: CollectionsResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionsResult {
    pub(crate) collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionDescription {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub(crate) result: CountResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResult {
    pub(crate) count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

/// Qdrant returns either a bare list or `{ "points": [...] }` depending on version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<RawScoredPoint>),
    Object { points: Vec<RawScoredPoint> },
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawScoredPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
