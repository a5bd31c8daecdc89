
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ChunkRecord, CollectionStats, MetricType, ScoredChunk, VectorStore};
use crate::{RagError, Result};

/// LanceDB-backed vector store. Each collection maps to a table with a fixed
/// `{id, vector, text}` schema; the vector dimension is set when the
/// collection is created and never changes in place.
pub struct LanceStore {
    connection: Connection,
    metric: MetricType,
}

impl LanceStore {
    /// Connect to (or create) a LanceDB database at the given directory.
    #[inline]
    pub async fn connect(path: impl AsRef<Path>, metric: MetricType) -> Result<Self> {
        let path = path.as_ref();
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            RagError::Store(format!("Failed to create vector store directory: {}", e))
        })?;

        let uri = format!("file://{}", path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to connect to LanceDB: {}", e)))?;

        info!("Vector store initialized at {}", path.display());
        Ok(Self { connection, metric })
    }

    #[inline]
    pub fn metric(&self) -> MetricType {
        self.metric
    }

    fn distance_type(&self) -> DistanceType {
        match self.metric {
            MetricType::Ip => DistanceType::Dot,
            MetricType::Cosine => DistanceType::Cosine,
            MetricType::L2 => DistanceType::L2,
        }
    }

    fn schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(records: &[ChunkRecord], dimension: usize) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimension);

        for record in records {
            if record.vector.len() != dimension {
                return Err(RagError::Store(format!(
                    "Vector length {} does not match collection dimension {}",
                    record.vector.len(),
                    dimension
                )));
            }
            ids.push(record.id);
            texts.push(record.text.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, dimension as i32, Arc::new(values_array), None)
                .map_err(|e| RagError::Store(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
        ];

        RecordBatch::try_new(Self::schema(dimension), arrays)
            .map_err(|e| RagError::Store(format!("Failed to create record batch: {}", e)))
    }

    async fn collection_dimension(&self, name: &str) -> Result<usize> {
        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open collection: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Store(format!("Failed to get collection schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::Store(format!(
            "Collection '{}' has no vector column",
            name
        )))
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
        let mut results = Vec::new();

        let ids = batch
            .column_by_name("id")
            .ok_or_else(|| RagError::Store("Missing id column".to_string()))?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| RagError::Store("Invalid id column type".to_string()))?;

        let texts = batch
            .column_by_name("text")
            .ok_or_else(|| RagError::Store("Missing text column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RagError::Store("Invalid text column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        for row in 0..batch.num_rows() {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            results.push(ScoredChunk {
                id: ids.value(row),
                text: texts.value(row).to_string(),
                distance,
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    #[inline]
    async fn has_collection(&self, name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list collections: {}", e)))?;

        Ok(table_names.iter().any(|n| n == name))
    }

    #[inline]
    async fn stats(&self, name: &str) -> Result<CollectionStats> {
        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open collection: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))?;

        Ok(CollectionStats {
            row_count: count as u64,
        })
    }

    #[inline]
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        info!(
            "Creating collection '{}' with dimension {} (metric: {})",
            name, dimension, self.metric
        );

        self.connection
            .create_empty_table(name, Self::schema(dimension))
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create collection: {}", e)))?;

        Ok(())
    }

    #[inline]
    async fn drop_collection(&self, name: &str) -> Result<()> {
        info!("Dropping collection '{}'", name);

        self.connection
            .drop_table(name)
            .await
            .map_err(|e| RagError::Store(format!("Failed to drop collection: {}", e)))?;

        Ok(())
    }

    #[inline]
    async fn insert(&self, name: &str, records: Vec<ChunkRecord>) -> Result<usize> {
        if records.is_empty() {
            debug!("No records to insert");
            return Ok(0);
        }

        let dimension = self.collection_dimension(name).await?;
        let record_batch = Self::create_record_batch(&records, dimension)?;

        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open collection: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to insert records: {}", e)))?;

        info!("Inserted {} records into '{}'", records.len(), name);
        Ok(records.len())
    }

    #[inline]
    async fn search(&self, name: &str, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        debug!(
            "Searching collection '{}' with limit {} (metric: {})",
            name, limit, self.metric
        );

        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open collection: {}", e)))?;

        let query = table
            .vector_search(query)
            .map_err(|e| RagError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(self.distance_type())
            .limit(limit);

        let mut stream = query
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read result stream: {}", e)))?
        {
            results.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Search returned {} results", results.len());
        Ok(results)
    }
}
