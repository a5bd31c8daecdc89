
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embeddings::EmbeddingProvider;
use crate::store::{ScoredChunk, VectorStore};
use crate::Result;

/// Fetches the chunks most similar to a query and flattens them into a
/// context block for prompt assembly.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    top_k: usize,
}

impl Retriever {
    #[inline]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            top_k,
        }
    }

    /// Search the collection for the chunks nearest to `query`, best match
    /// first.
    ///
    /// A missing collection is not an error: retrieval degrades to an empty
    /// result so the conversation can proceed without document context.
    #[inline]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        if !self.store.has_collection(&self.collection).await? {
            warn!(
                "Collection '{}' does not exist, returning empty context",
                self.collection
            );
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query)?;
        let hits = self
            .store
            .search(&self.collection, &vector, self.top_k)
            .await?;
        debug!(
            "Retrieved {} chunks from collection '{}'",
            hits.len(),
            self.collection
        );
        Ok(hits)
    }

    /// Retrieve and join chunk texts with newlines. Returns an empty string
    /// when nothing is retrievable.
    #[inline]
    pub async fn retrieve_context(&self, query: &str) -> Result<String> {
        let hits = self.retrieve(query).await?;
        Ok(join_chunks(&hits))
    }
}

#[inline]
pub fn join_chunks(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
