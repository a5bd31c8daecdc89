
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::settings::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embeddings::EmbeddingProvider;
use crate::store::{ChunkRecord, VectorStore};
use crate::{RagError, Result};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Document not found: {0}")]
    InvalidPath(PathBuf),

    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Embedding dimension mismatch at chunk {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to extract text from {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("Document produced no chunks: {0}")]
    EmptyDocument(PathBuf),
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Drop and recreate the collection even if it already holds data.
    /// Destructive; confirmation is the caller's responsibility.
    pub force_rebuild: bool,
}

impl Default for IngestOptions {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            force_rebuild: false,
        }
    }
}

/// Loads a document, splits it into overlapping chunks, embeds each chunk,
/// and populates the target collection.
pub struct Ingestor {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
}

impl Ingestor {
    #[inline]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    /// Ingest a document into the collection, returning the collection's row
    /// count.
    ///
    /// The document path must exist on every call. If the collection already
    /// exists and `force_rebuild` is false, this short-circuits with the
    /// existing row count without reading the document, which makes repeated
    /// calls cheap and idempotent. With
    /// `force_rebuild`, the existing collection is dropped after the new
    /// embeddings have been computed, so an embedding failure leaves the old
    /// data untouched.
    #[inline]
    pub async fn ingest(&self, path: &Path, options: &IngestOptions) -> Result<u64> {
        if !path.exists() {
            return Err(IngestError::InvalidPath(path.to_path_buf()).into());
        }

        let exists = self.store.has_collection(&self.collection).await?;
        if exists && !options.force_rebuild {
            let stats = self.store.stats(&self.collection).await?;
            info!(
                "Collection '{}' already exists with {} rows, skipping ingestion",
                self.collection, stats.row_count
            );
            return Ok(stats.row_count);
        }

        info!("Loading document: {}", path.display());
        let text = load_document(path)?;

        debug!(
            "Splitting document into chunks (size: {}, overlap: {})",
            options.chunk_size, options.chunk_overlap
        );
        let chunks = split_text(&text, options.chunk_size, options.chunk_overlap)?;
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument(path.to_path_buf()).into());
        }
        info!("Document split into {} chunks", chunks.len());

        let records = self.embed_chunks(chunks)?;
        let dimension = records
            .first()
            .map(|record| record.vector.len())
            .ok_or_else(|| IngestError::EmptyDocument(path.to_path_buf()))?;

        if exists {
            info!("Force rebuild: dropping collection '{}'", self.collection);
            self.store.drop_collection(&self.collection).await?;
        }
        self.store
            .create_collection(&self.collection, dimension)
            .await?;

        let inserted = self.store.insert(&self.collection, records).await?;
        info!(
            "Inserted {} chunks into collection '{}'",
            inserted, self.collection
        );

        Ok(inserted as u64)
    }

    /// Embed every chunk, deriving the collection dimension from the first
    /// and rejecting any vector that disagrees with it.
    fn embed_chunks(&self, chunks: Vec<String>) -> Result<Vec<ChunkRecord>> {
        let progress = ProgressBar::new(chunks.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Embedding chunks");

        let mut expected_dimension = None;
        let mut records = Vec::with_capacity(chunks.len());

        for (index, text) in chunks.into_iter().enumerate() {
            let vector = self.embedder.embed(&text)?;

            match expected_dimension {
                None => {
                    debug!("Derived embedding dimension: {}", vector.len());
                    expected_dimension = Some(vector.len());
                }
                Some(expected) if expected != vector.len() => {
                    progress.abandon();
                    return Err(IngestError::DimensionMismatch {
                        index,
                        expected,
                        actual: vector.len(),
                    }
                    .into());
                }
                Some(_) => {}
            }

            records.push(ChunkRecord {
                id: index as i64,
                vector,
                text,
            });
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(records)
    }
}

/// Load a document's text. PDF content goes through `pdf-extract`; anything
/// else is read as UTF-8 text.
#[inline]
pub fn load_document(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| {
            RagError::Ingest(IngestError::Extraction {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
    } else {
        std::fs::read_to_string(path).map_err(|e| {
            RagError::Ingest(IngestError::Extraction {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
    }
}

/// Split text into overlapping windows of `chunk_size` characters, with
/// `chunk_overlap` characters shared between consecutive windows. Windows
/// that are entirely whitespace are dropped.
#[inline]
pub fn split_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> std::result::Result<Vec<String>, IngestError> {
    if chunk_size == 0 || chunk_overlap >= chunk_size {
        return Err(IngestError::InvalidChunking {
            size: chunk_size,
            overlap: chunk_overlap,
        });
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
