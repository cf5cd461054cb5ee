//! Configuration management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Vector store connection and collection naming
    pub store: StoreConfig,

    /// Embedding model configuration
    pub embedding: EmbeddingConfig,

    /// LLM provider configuration (generator / rerank)
    pub llm: LlmConfig,

    /// Retrieval pipeline tunables
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Vector store
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.store.url = url;
        }
        if let Ok(key) = std::env::var("QDRANT_API_KEY") {
            config.store.api_key = Some(key);
        }
        if let Ok(prefix) = std::env::var("COLLECTION_PREFIX") {
            config.store.collection_prefix = prefix;
        }
        if let Ok(base) = std::env::var("COLLECTION_NAME") {
            config.store.collection_base = base;
        }
        if let Ok(name) = std::env::var("JOB_COLLECTION") {
            config.store.job_collection = name;
        }

        // Embedding
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider.parse()?;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key.clone());
            config.embedding.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url.clone();
            config.embedding.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }

        // Retrieval
        if let Ok(size) = std::env::var("CHUNK_SIZE") {
            config.retrieval.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }
        if let Ok(overlap) = std::env::var("CHUNK_OVERLAP") {
            config.retrieval.chunk_overlap =
                overlap.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "CHUNK_OVERLAP".to_string(),
                    value: overlap,
                })?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence for secrets)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.store.url != StoreConfig::default().url {
            self.store.url = env_config.store.url;
        }

        // Always use env for sensitive values
        if env_config.store.api_key.is_some() {
            self.store.api_key = env_config.store.api_key;
        }
        if env_config.llm.openai_api_key.is_some() {
            self.embedding.openai_api_key = env_config.llm.openai_api_key.clone();
            self.llm.openai_api_key = env_config.llm.openai_api_key;
        }

        Ok(self)
    }
}

/// Vector store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Qdrant gRPC URL
    pub url: String,

    /// Optional API key for managed deployments
    pub api_key: Option<String>,

    /// Isolation prefix prepended to the document collection name
    pub collection_prefix: String,

    /// Logical base name of the document collection
    pub collection_base: String,

    /// Fixed name of the job-matching collection (no prefix)
    pub job_collection: String,

    /// Vector dimension (must match the embedding model)
    pub vector_dimension: usize,
}

impl StoreConfig {
    /// Full name of the document collection: `{prefix}{base}`
    pub fn document_collection(&self) -> String {
        format!("{}{}", self.collection_prefix, self.collection_base)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection_prefix: "rag_app_".to_string(),
            collection_base: "documents".to_string(),
            job_collection: "hrsd_jobs".to_string(),
            vector_dimension: 384, // all-minilm
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider to use
    pub provider: LlmProvider,

    /// Embedding model name
    pub model: String,

    /// OpenAI API key (when provider = openai)
    pub openai_api_key: Option<String>,

    /// Ollama server URL (when provider = ollama)
    pub ollama_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: "all-minilm".to_string(),
            openai_api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2048,
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM / embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
}

impl Default for LlmProvider {
    fn default() -> Self {
        Self::OpenAI
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Target chunk size for document processing (characters)
    pub chunk_size: usize,

    /// Chunk overlap (characters)
    pub chunk_overlap: usize,

    /// Chunks shorter than this are dropped, not padded. Set to 0 to keep
    /// every trailing fragment.
    pub min_chunk_len: usize,

    /// Default top-k for document search
    pub doc_top_k: usize,

    /// Default top-k for job matching
    pub job_top_k: usize,

    /// Whether to run the best-effort LLM rerank over job candidates
    pub rerank_enabled: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_len: 50,
            doc_top_k: 5,
            job_top_k: 10,
            rerank_enabled: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.store.vector_dimension, 384);
        assert_eq!(config.store.document_collection(), "rag_app_documents");
        assert_eq!(config.store.job_collection, "hrsd_jobs");
        assert_eq!(config.retrieval.doc_top_k, 5);
        assert_eq!(config.retrieval.job_top_k, 10);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            "openai".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenAI
        );
        assert_eq!(
            "Ollama".parse::<LlmProvider>().unwrap(),
            LlmProvider::Ollama
        );
        assert!("invalid".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_document_collection_name_uses_prefix() {
        let store = StoreConfig {
            collection_prefix: "tenant42_".to_string(),
            collection_base: "kb".to_string(),
            ..Default::default()
        };
        assert_eq!(store.document_collection(), "tenant42_kb");
    }
}
