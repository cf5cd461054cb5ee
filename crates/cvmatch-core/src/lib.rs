//! CVMatch Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the cvmatch
//! retrieval engine:
//! - Record types for the two pipelines (document chunks, job postings)
//! - Search result shapes with normalized match scores
//! - Common error types
//! - The `LlmClient` trait for the external generator capability
//! - Configuration management

pub mod config;
pub mod logging;

pub use logging::init_logging;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, LlmConfig, LlmProvider, LoggingConfig,
    RetrievalConfig, StoreConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for cvmatch operations
#[derive(Error, Debug)]
pub enum CvMatchError {
    /// Target of a lookup does not exist. List/delete paths treat this as a
    /// no-op success instead of surfacing it.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The vector store could not be reached. Fatal for the current call,
    /// never retried internally.
    #[error("Vector store unavailable during {operation}: {message}")]
    StoreUnavailable { operation: &'static str, message: String },

    /// A store operation failed after a successful connection. Carries enough
    /// context for the caller to decide retry policy.
    #[error("Store operation {operation} failed on collection {collection}: {message}")]
    Store {
        operation: &'static str,
        collection: String,
        message: String,
    },

    /// Record violates the collection schema (wrong vector dimension,
    /// unknown field). The offending records are rejected, never coerced.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Upload extension no extractor handles. Distinct from a parse
    /// failure on a supported format.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// A supported format failed to yield usable text.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Embedding or generation API failure.
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CvMatchError>;

// ============================================================================
// Document Pipeline Models
// ============================================================================

/// A single retrieved document chunk with its normalized match score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHit {
    /// Chunk body
    pub text: String,

    /// Source document identifier
    pub filename: String,

    /// Ordinal position of this chunk within the source document
    pub chunk_index: i64,

    /// Normalized match score, 0-100 (100 = identical embedding)
    pub score: f32,
}

/// Per-document chunk count, as returned by the listing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub chunk_count: u64,
}

// ============================================================================
// Job Pipeline Models
// ============================================================================

/// A job posting record as stored in the job collection.
///
/// All fields are bounded-length strings; `composite_text` is the canonical
/// embedding input. The field ordering in the composite is part of the
/// embedding-space contract: changing it requires re-embedding every stored
/// record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(alias = "title", alias = "position")]
    pub job_title: String,
    #[serde(default, alias = "employer")]
    pub company: String,
    pub description: String,
    #[serde(default, alias = "skills", alias = "qualifications")]
    pub required_skills: String,
    #[serde(default, alias = "experience", alias = "seniority")]
    pub experience_level: String,
    #[serde(default, alias = "education", alias = "degree")]
    pub education_requirements: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "salary", alias = "compensation")]
    pub salary_range: String,
}

impl JobRecord {
    /// Synthesize the composite string that gets embedded for this job.
    ///
    /// Fixed template: title, company, description, skills, experience,
    /// education, location, in that order.
    pub fn composite_text(&self) -> String {
        format!(
            "Job Title: {}\nCompany: {}\nDescription: {}\nRequired Skills: {}\n\
             Experience Level: {}\nEducation: {}\nLocation: {}",
            self.job_title,
            self.company,
            self.description,
            self.required_skills,
            self.experience_level,
            self.education_requirements,
            self.location,
        )
    }

    /// A record is storable when it has at least a title and a description.
    pub fn is_valid(&self) -> bool {
        !self.job_title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// A job returned from CV matching, annotated with its match score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    #[serde(flatten)]
    pub job: JobRecord,

    /// Normalized match score, 0-100
    pub match_score: f32,
}

// ============================================================================
// Store Introspection
// ============================================================================

/// Statistics for a single collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Full collection name as stored (prefix + base)
    pub collection: String,

    /// Row count; accurate when obtained by scan, approximate when the scan
    /// fell back to the store's own stats
    pub row_count: u64,

    /// Isolation prefix portion of the name (empty for fixed-name collections)
    pub prefix: String,

    /// Logical base name
    pub base_name: String,
}

// ============================================================================
// Chat Types
// ============================================================================

/// One turn of conversation history passed through to the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for LLM clients (the external "Generator" capability).
///
/// Given a fully assembled prompt, returns generated text. May fail
/// transiently; callers are expected to have a fallback user-facing message.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_text_field_order() {
        let job = JobRecord {
            job_title: "Software Engineer".to_string(),
            company: "TechCorp".to_string(),
            description: "Build services".to_string(),
            required_skills: "Rust, SQL".to_string(),
            experience_level: "Mid-level".to_string(),
            education_requirements: "BSc".to_string(),
            location: "Riyadh".to_string(),
            salary_range: "15k-25k".to_string(),
        };

        let text = job.composite_text();
        let title_pos = text.find("Software Engineer").unwrap();
        let company_pos = text.find("TechCorp").unwrap();
        let desc_pos = text.find("Build services").unwrap();
        let skills_pos = text.find("Rust, SQL").unwrap();
        let loc_pos = text.find("Riyadh").unwrap();

        assert!(title_pos < company_pos);
        assert!(company_pos < desc_pos);
        assert!(desc_pos < skills_pos);
        assert!(skills_pos < loc_pos);

        // Salary is display-only metadata, never embedded
        assert!(!text.contains("15k-25k"));
    }

    #[test]
    fn test_job_record_validity() {
        let mut job = JobRecord {
            job_title: "Analyst".to_string(),
            description: "Analyze things".to_string(),
            ..Default::default()
        };
        assert!(job.is_valid());

        job.description = "   ".to_string();
        assert!(!job.is_valid());
    }

    #[test]
    fn test_job_record_deserializes_with_missing_optionals() {
        let json = r#"{"job_title": "Clerk", "description": "Filing"}"#;
        let job: JobRecord = serde_json::from_str(json).unwrap();
        assert!(job.is_valid());
        assert!(job.company.is_empty());
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::user("hi").role, "user");
        assert_eq!(ChatMessage::assistant("hello").role, "assistant");
    }
}
