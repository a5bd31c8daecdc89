// Vector store module
// Named collections of embedded chunks with similarity search

pub mod lancedb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use lancedb::LanceStore;

/// A chunk of source text with its embedding, the unit of storage and
/// retrieval. Immutable once stored; removed only by dropping the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: i64,
    pub vector: Vec<f32>,
    pub text: String,
}

/// A chunk returned from similarity search, ranked by ascending distance.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: i64,
    pub text: String,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    pub row_count: u64,
}

/// Similarity metric for a collection. Fixed for the collection's lifetime;
/// changing it requires drop+recreate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Inner product
    #[default]
    Ip,
    Cosine,
    L2,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip => write!(f, "ip"),
            Self::Cosine => write!(f, "cosine"),
            Self::L2 => write!(f, "l2"),
        }
    }
}

/// Contract for the external vector store capability.
///
/// A collection's embedding dimension is fixed at creation; inserting vectors
/// of a different length is an error surfaced by the implementation.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn has_collection(&self, name: &str) -> Result<bool>;

    async fn stats(&self, name: &str) -> Result<CollectionStats>;

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()>;

    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Insert a batch of records, returning the number inserted. The batch is
    /// handed to the store whole; partial failure leaves the collection
    /// partially populated.
    async fn insert(&self, name: &str, records: Vec<ChunkRecord>) -> Result<usize>;

    /// Top-`limit` similarity search using the store's configured metric.
    async fn search(&self, name: &str, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;
}
