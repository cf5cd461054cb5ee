//! Embedding client for generating vector representations
//!
//! Supports OpenAI and Ollama embedding APIs behind the `EmbeddingClient`
//! trait, wrapped by `Embedder` which owns the lazy, single-flight
//! initialization of the underlying model connection.

use async_trait::async_trait;
use cvmatch_core::{CvMatchError, EmbeddingConfig, LlmProvider, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// Embedding dimension for a known model name.
///
/// The collection dimension is fixed at creation time from this value, so an
/// unknown model falls back to the reference model's 384.
pub fn model_dimension(model: &str) -> usize {
    match model {
        "all-minilm" | "all-MiniLM-L6-v2" => 384,
        "nomic-embed-text" => 768,
        "mxbai-embed-large" => 1024,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 384,
    }
}

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

// ============================================================================
// Lazy Embedder Handle
// ============================================================================

/// Process-wide embedding handle with lazy, guarded initialization.
///
/// Construction is cheap and infallible so services can be wired up (and
/// health-checked) without paying the model-connection cost. The first
/// `encode` call initializes the inner client exactly once (concurrent
/// first calls share a single initialization) and verifies that the model
/// really produces vectors of the advertised dimension. After that the
/// handle is immutable and safe for concurrent read-only use.
pub struct Embedder {
    config: EmbeddingConfig,
    inner: OnceCell<Box<dyn EmbeddingClient>>,
}

impl Embedder {
    /// Create an uninitialized embedder from configuration.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    /// The dimension this embedder will produce, known before initialization.
    pub fn dimension(&self) -> usize {
        model_dimension(&self.config.model)
    }

    async fn client(&self) -> Result<&dyn EmbeddingClient> {
        let client = self
            .inner
            .get_or_try_init(|| async {
                tracing::info!(model = %self.config.model, "loading embedding model");
                let client = create_embedding_client(&self.config)?;

                // Warm-up probe: catches a wrong endpoint or a model whose
                // real dimension disagrees with the collection schema before
                // any record is written.
                let probe = client.embed(" ").await?;
                if probe.len() != client.dimension() {
                    return Err(CvMatchError::SchemaViolation(format!(
                        "embedding model {} returned dimension {} (expected {})",
                        self.config.model,
                        probe.len(),
                        client.dimension()
                    )));
                }

                tracing::info!(model = %self.config.model, dimension = client.dimension(), "embedding model ready");
                Ok::<_, CvMatchError>(client)
            })
            .await?;
        Ok(client.as_ref())
    }

    /// Encode a batch of texts into vectors, one per input, in input order.
    ///
    /// Empty strings are tolerated: they are substituted with a single space
    /// so the backend produces a fixed vector instead of rejecting the batch.
    pub async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let sanitized: Vec<String> = texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    " ".to_string()
                } else {
                    t.clone()
                }
            })
            .collect();

        let client = self.client().await?;
        let vectors = client.embed_batch(&sanitized).await?;

        if vectors.len() != texts.len() {
            return Err(CvMatchError::LlmError(format!(
                "embedding batch returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }

    /// Encode a single text.
    pub async fn encode_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.encode(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| CvMatchError::LlmError("no embedding returned".to_string()))
    }
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = model_dimension(&model);

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| CvMatchError::ConfigError("OpenAI API key required".to_string()))?;

        Ok(Self::new(api_key.clone(), config.model.clone()))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| CvMatchError::LlmError("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CvMatchError::LlmError(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CvMatchError::LlmError(format!(
                "OpenAI embedding error: {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            CvMatchError::LlmError(format!("Failed to parse embedding response: {e}"))
        })?;

        // Sort by index and extract embeddings
        let mut embeddings: Vec<_> = result.data.into_iter().collect();
        embeddings.sort_by_key(|e| e.index);

        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = model_dimension(&model);

        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.model.clone())
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CvMatchError::LlmError(format!("Ollama embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CvMatchError::LlmError(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            CvMatchError::LlmError(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no native batch embedding; process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider {
        LlmProvider::OpenAI => Ok(Box::new(OpenAiEmbedding::from_config(config)?)),
        LlmProvider::Ollama => Ok(Box::new(OllamaEmbedding::from_config(config))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dimensions() {
        assert_eq!(model_dimension("all-minilm"), 384);
        assert_eq!(model_dimension("all-MiniLM-L6-v2"), 384);
        assert_eq!(model_dimension("nomic-embed-text"), 768);
        assert_eq!(model_dimension("text-embedding-3-large"), 3072);
        // unknown models fall back to the reference dimension
        assert_eq!(model_dimension("mystery-model"), 384);
    }

    #[test]
    fn test_openai_client_dimension() {
        let client = OpenAiEmbedding::new("test-key", "text-embedding-3-small");
        assert_eq!(client.dimension(), 1536);
    }

    #[test]
    fn test_ollama_client_dimension() {
        let client = OllamaEmbedding::new("http://localhost:11434", "mxbai-embed-large");
        assert_eq!(client.dimension(), 1024);
    }

    #[test]
    fn test_embedder_dimension_known_before_init() {
        let embedder = Embedder::new(EmbeddingConfig::default());
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_encode_empty_batch_is_zero_effect() {
        // Must not touch the (unreachable) backend at all
        let embedder = Embedder::new(EmbeddingConfig {
            ollama_url: "http://localhost:1".to_string(),
            ..Default::default()
        });
        let vectors = embedder.encode(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = EmbeddingConfig {
            provider: LlmProvider::OpenAI,
            openai_api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            OpenAiEmbedding::from_config(&config),
            Err(CvMatchError::ConfigError(_))
        ));
    }
}
