//! Document collection index
//!
//! Ingests chunked document text, serves similarity search with normalized
//! scores, and answers the collection-introspection queries (per-file chunk
//! counts, row stats, deletes).

use cvmatch_core::{CvMatchError, DocumentHit, DocumentSummary, Result};
use cvmatch_extract::Chunk;
use cvmatch_vector::{match_score, Embedder, QdrantStore};
use std::sync::Arc;

use crate::records::DocumentChunkRecord;

/// Index over the document chunk collection.
pub struct DocumentIndex {
    store: QdrantStore,
    embedder: Arc<Embedder>,
}

impl DocumentIndex {
    /// Bind an index to a store and embedder.
    ///
    /// Rejects an embedder whose dimension disagrees with the collection
    /// schema; catching this at wiring time beats a rejected insert later.
    pub fn new(store: QdrantStore, embedder: Arc<Embedder>) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(CvMatchError::SchemaViolation(format!(
                "embedder dimension {} does not match collection {} dimension {}",
                embedder.dimension(),
                store.collection(),
                store.dimension()
            )));
        }
        Ok(Self { store, embedder })
    }

    /// Embed and insert a batch of chunks. Returns the inserted count;
    /// an empty batch is a zero-effect success.
    pub async fn add_documents(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.encode(&texts).await?;

        let records: Vec<DocumentChunkRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                DocumentChunkRecord::new(&chunk.text, &chunk.source_id, chunk.index, vector)
            })
            .collect();

        let inserted = self.store.insert(&records).await?;
        tracing::info!(
            collection = %self.store.collection(),
            chunks = inserted,
            "indexed document chunks"
        );
        Ok(inserted)
    }

    /// Similarity search over chunks, best first, scores normalized to 0-100.
    ///
    /// Hits with a malformed payload are dropped rather than surfaced as
    /// partially empty results.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<DocumentHit>> {
        let query_vector = self.embedder.encode_one(query).await?;
        let hits = self.store.search(&query_vector, top_k).await?;

        let decoded: Vec<DocumentHit> = hits
            .iter()
            .filter_map(|hit| {
                let (text, filename, chunk_index) = DocumentChunkRecord::decode(hit)?;
                Some(DocumentHit {
                    text,
                    filename,
                    chunk_index,
                    score: match_score(hit.similarity),
                })
            })
            .collect();

        if decoded.len() < hits.len() {
            tracing::warn!(
                collection = %self.store.collection(),
                dropped = hits.len() - decoded.len(),
                "dropped hits with malformed payloads"
            );
        }

        Ok(decoded)
    }

    /// Distinct indexed files with their chunk counts, sorted by filename.
    /// A missing collection reads as an empty library.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let counts = self.store.count_by_field("filename").await?;
        Ok(counts
            .into_iter()
            .map(|(filename, chunk_count)| DocumentSummary {
                filename,
                chunk_count,
            })
            .collect())
    }

    /// Remove every chunk of one file. Unknown filenames are a no-op.
    pub async fn delete_document(&self, filename: &str) -> Result<()> {
        self.store.delete_where("filename", filename).await?;
        tracing::info!(filename, "deleted document chunks");
        Ok(())
    }

    /// Row statistics for the chunk collection.
    pub async fn stats(&self) -> Result<cvmatch_core::CollectionStats> {
        self.store.stats().await
    }

    /// Names of all collections carrying the configured prefix.
    pub async fn list_app_collections(&self) -> Result<Vec<String>> {
        self.store.list_app_collections().await
    }

    pub fn collection(&self) -> &str {
        self.store.collection()
    }
}
