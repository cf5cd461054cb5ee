//! Qdrant implementation for vector storage
//!
//! Owns one schema-bound collection: creation, batch insert with dimension
//! validation, similarity search, grouped metadata scans, filtered deletes,
//! and row-count statistics.

use cvmatch_core::{CollectionStats, CvMatchError, Result, StoreConfig};
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PayloadIncludeSelector, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{StoreHit, VectorRecord};

/// Page size for metadata scans.
const SCROLL_PAGE: u32 = 256;

/// Hard cap on rows visited by a scan, to bound query cost. Counts above
/// this fall back to the store's approximate statistics.
const SCAN_LIMIT: u64 = 16384;

/// Qdrant vector store bound to a single collection.
///
/// Connection lifecycle: `connect` builds the client and performs a health
/// check; a failure there is surfaced immediately and never retried. All
/// other operations assume a connected client and surface per-call errors
/// with operation and collection context attached.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    prefix: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connect to Qdrant and bind to `collection`.
    ///
    /// `prefix` is the isolation-prefix portion of the collection name
    /// (empty for fixed-name collections such as the job collection); it is
    /// only used for stats reporting and prefix-scoped listing.
    pub async fn connect(
        config: &StoreConfig,
        collection: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder.build().map_err(|e| CvMatchError::StoreUnavailable {
            operation: "connect",
            message: e.to_string(),
        })?;

        client
            .health_check()
            .await
            .map_err(|e| CvMatchError::StoreUnavailable {
                operation: "health_check",
                message: e.to_string(),
            })?;

        let collection = collection.into();
        tracing::debug!(collection = %collection, "connected to vector store");

        Ok(Self {
            client,
            collection,
            prefix: prefix.into(),
            dimension: config.vector_dimension,
        })
    }

    /// Collection name this store is bound to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Vector dimension fixed for this collection.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn op_err(&self, operation: &'static str, message: impl ToString) -> CvMatchError {
        CvMatchError::Store {
            operation,
            collection: self.collection.clone(),
            message: message.to_string(),
        }
    }

    fn check_dimension(&self, vector: &[f32], what: &str) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(CvMatchError::SchemaViolation(format!(
                "{what} has dimension {} but collection {} expects {}",
                vector.len(),
                self.collection,
                self.dimension
            )));
        }
        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(false)
                } else {
                    Err(self.op_err("collection_info", msg))
                }
            }
        }
    }

    /// Idempotently create the collection with its vector schema.
    ///
    /// Existing collections are left untouched: the schema is fixed at
    /// creation and never altered in place.
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            tracing::debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| self.op_err("create_collection", e))?;

        tracing::info!(
            collection = %self.collection,
            dimension = self.dimension,
            "created collection"
        );
        Ok(())
    }

    /// Insert a batch of records, assigning each a fresh unique id.
    ///
    /// The whole batch is validated against the collection dimension before
    /// any network call; a single offending record rejects the batch with a
    /// `SchemaViolation` naming its position. Empty input is a zero-effect
    /// success. Returns the inserted count.
    pub async fn insert<R: VectorRecord>(&self, records: &[R]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        for (i, record) in records.iter().enumerate() {
            self.check_dimension(record.vector(), &format!("record {i}"))?;
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| {
                PointStruct::new(
                    Uuid::new_v4().to_string(),
                    record.vector().to_vec(),
                    record.payload(),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| self.op_err("insert", e))?;

        tracing::info!(
            collection = %self.collection,
            count = records.len(),
            "inserted records"
        );
        Ok(records.len())
    }

    /// Approximate nearest-neighbor search, closest first.
    ///
    /// Returns up to `top_k` hits carrying the raw cosine similarity and the
    /// stored payload; fewer when the collection holds fewer rows.
    pub async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<StoreHit>> {
        self.check_dimension(query_vector, "query vector")?;

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| self.op_err("search", e))?;

        let hits: Vec<StoreHit> = results
            .result
            .into_iter()
            .map(|point| StoreHit {
                id: point_id_string(point.id.as_ref()),
                similarity: point.score,
                payload: point.payload,
            })
            .collect();

        tracing::debug!(
            collection = %self.collection,
            hits = hits.len(),
            "similarity search completed"
        );
        Ok(hits)
    }

    /// Group-by counts of a scalar string field across the collection.
    ///
    /// Scans at most `SCAN_LIMIT` rows. A missing or empty collection yields
    /// an empty list, not an error.
    pub async fn count_by_field(&self, field: &str) -> Result<Vec<(String, u64)>> {
        if !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut offset: Option<PointId> = None;
        let mut scanned = 0u64;

        loop {
            let mut scroll = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(PayloadIncludeSelector {
                    fields: vec![field.to_string()],
                })
                .with_vectors(false);

            if let Some(off) = offset {
                scroll = scroll.offset(off);
            }

            let response = self
                .client
                .scroll(scroll)
                .await
                .map_err(|e| self.op_err("scroll", e))?;

            let points = response.result;
            if points.is_empty() {
                break;
            }

            scanned += points.len() as u64;
            for point in &points {
                if let Some(value) = crate::payload_str(&point.payload, field) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() || scanned >= SCAN_LIMIT {
                break;
            }
        }

        let mut grouped: Vec<(String, u64)> = counts.into_iter().collect();
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(grouped)
    }

    /// Delete every row whose `field` equals `value`.
    ///
    /// A filter matching nothing, or a missing collection, is a no-op
    /// success so delete flows stay idempotent.
    pub async fn delete_where(&self, field: &str, value: &str) -> Result<()> {
        if !self.collection_exists().await? {
            return Ok(());
        }

        let filter = Filter::must([Condition::matches(field, value.to_string())]);

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter))
            .await
            .map_err(|e| self.op_err("delete", e))?;

        tracing::info!(
            collection = %self.collection,
            field,
            value,
            "deleted matching rows"
        );
        Ok(())
    }

    /// Collection statistics: accurate row count by bounded scan, with the
    /// store's approximate count as fallback when the scan fails.
    pub async fn stats(&self) -> Result<CollectionStats> {
        if !self.collection_exists().await? {
            return Err(CvMatchError::NotFound(format!(
                "collection {} does not exist",
                self.collection
            )));
        }

        let row_count = match self.scan_count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    collection = %self.collection,
                    error = %e,
                    "scan count failed, falling back to approximate stats"
                );
                self.approximate_count().await?
            }
        };

        let base_name = self
            .collection
            .strip_prefix(&self.prefix)
            .unwrap_or(&self.collection)
            .to_string();

        Ok(CollectionStats {
            collection: self.collection.clone(),
            row_count,
            prefix: self.prefix.clone(),
            base_name,
        })
    }

    async fn scan_count(&self) -> Result<u64> {
        let mut count = 0u64;
        let mut offset: Option<PointId> = None;

        loop {
            let mut scroll = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(false)
                .with_vectors(false);

            if let Some(off) = offset {
                scroll = scroll.offset(off);
            }

            let response = self
                .client
                .scroll(scroll)
                .await
                .map_err(|e| self.op_err("scan_count", e))?;

            if response.result.is_empty() {
                break;
            }
            count += response.result.len() as u64;

            offset = response.next_page_offset;
            if offset.is_none() || count >= SCAN_LIMIT {
                break;
            }
        }

        Ok(count)
    }

    async fn approximate_count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| self.op_err("collection_info", e))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    /// Names of all collections carrying this store's isolation prefix.
    pub async fn list_app_collections(&self) -> Result<Vec<String>> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| self.op_err("list_collections", e))?;

        Ok(collections
            .collections
            .into_iter()
            .map(|c| c.name)
            .filter(|name| !self.prefix.is_empty() && name.starts_with(&self.prefix))
            .collect())
    }
}

fn point_id_string(id: Option<&PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;

    match id.and_then(|id| id.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
