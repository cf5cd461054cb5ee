//! CVMatch Vector - Embedding generation and vector storage
//!
//! Provides the two halves of the retrieval engine's data path:
//! - `Embedder`: lazily initialized text-to-vector encoding over an HTTP
//!   embedding API
//! - `QdrantStore`: schema management, batch insert, similarity search,
//!   grouped metadata listing, and filtered deletion against one collection

use std::collections::HashMap;

use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::Value;

pub mod embedding;
pub mod qdrant_store;

pub use embedding::{Embedder, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding};
pub use qdrant_store::QdrantStore;

/// A record that can be written to a vector collection.
///
/// The two concrete implementations are the document-chunk row and the job
/// row in `cvmatch-retrieval`; the store itself only needs the vector (for
/// dimension validation and indexing) and the scalar payload.
pub trait VectorRecord: Send + Sync {
    /// The embedding for this record; must have the collection's dimension
    fn vector(&self) -> &[f32];

    /// Scalar fields stored alongside the vector
    fn payload(&self) -> HashMap<String, Value>;
}

/// A raw hit from similarity search: point id, raw cosine similarity, and
/// the stored payload. Callers decode the payload into their typed records.
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub id: String,
    pub similarity: f32,
    pub payload: HashMap<String, Value>,
}

/// Normalize a raw cosine similarity into a 0-100 match percentage.
///
/// Identical embeddings score 100, orthogonal ones 0; negative similarities
/// clamp to 0 so a user never sees a negative match score. The conversion is
/// lossy and approximate by design, not a probability.
pub fn match_score(similarity: f32) -> f32 {
    similarity.clamp(0.0, 1.0) * 100.0
}

/// Read a string payload field, if present and string-typed.
pub fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

/// Read an integer payload field, if present and integer-typed.
pub fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(n)) => Some(*n),
        _ => None,
    })
}
