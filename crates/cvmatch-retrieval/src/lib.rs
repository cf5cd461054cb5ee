//! CVMatch Retrieval - End-to-end retrieval service
//!
//! Wires extraction, chunking, embedding, the vector store, and answer
//! synthesis into the two user-facing flows:
//! - document chat: upload files, ask questions grounded in their content
//! - CV matching: upload a CV, rank job postings against it and explain
//!   the matches

use cvmatch_core::{
    AppConfig, ChatMessage, CollectionStats, CvMatchError, DocumentHit, DocumentSummary, JobMatch,
    JobRecord, Result,
};
use cvmatch_extract::{extract_text, Chunker, ExtractError};
use cvmatch_rag::{create_llm_client, Synthesizer};
use cvmatch_vector::{Embedder, QdrantStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod documents;
pub mod jobs;
pub mod records;

pub use documents::DocumentIndex;
pub use jobs::{parse_jobs_json, JobIndex};
pub use records::{DocumentChunkRecord, JobRow};

/// CV text passed to the analysis prompt is capped at this many characters.
const CV_CONTEXT_LEN: usize = 2000;

/// Lift an extraction failure into the service error space without merging
/// kinds: an unhandled extension stays distinguishable from a parse failure
/// on a supported format.
fn extraction_error(e: ExtractError) -> CvMatchError {
    match e {
        ExtractError::UnsupportedFormat(ext) => CvMatchError::UnsupportedFormat(ext),
        other => CvMatchError::Extraction(other.to_string()),
    }
}

/// Result of ingesting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub filename: String,
    pub chunks_indexed: usize,
}

/// A chat answer with the chunks it was grounded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    pub sources: Vec<DocumentHit>,
}

/// A CV matching result: ranked jobs plus the generated career analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvMatchReport {
    pub matches: Vec<JobMatch>,
    pub analysis: String,
}

/// The assembled retrieval service.
pub struct RetrievalService {
    documents: DocumentIndex,
    jobs: JobIndex,
    synthesizer: Arc<Synthesizer>,
    chunker: Chunker,
    doc_top_k: usize,
    job_top_k: usize,
}

impl RetrievalService {
    /// Connect every component from configuration.
    ///
    /// Creates both collections if absent. The embedding model itself is
    /// loaded lazily on first use, so construction succeeds while the
    /// embedding backend is still warming up.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let embedder = Arc::new(Embedder::new(config.embedding.clone()));

        let doc_store = QdrantStore::connect(
            &config.store,
            config.store.document_collection(),
            config.store.collection_prefix.clone(),
        )
        .await?;
        doc_store.ensure_collection().await?;

        let job_store =
            QdrantStore::connect(&config.store, config.store.job_collection.clone(), "").await?;
        job_store.ensure_collection().await?;

        let llm: Arc<dyn cvmatch_core::LlmClient> = Arc::from(create_llm_client(&config.llm)?);
        let synthesizer = Arc::new(Synthesizer::new(llm));

        let documents = DocumentIndex::new(doc_store, Arc::clone(&embedder))?;
        let mut jobs = JobIndex::new(job_store, Arc::clone(&embedder))?;
        if config.retrieval.rerank_enabled {
            jobs = jobs.with_rescoring(Arc::clone(&synthesizer));
        }

        let chunker = Chunker::new(
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
            config.retrieval.min_chunk_len,
        )
        .map_err(|e| CvMatchError::ConfigError(e.to_string()))?;

        tracing::info!(
            documents = %documents.collection(),
            jobs = %jobs.collection(),
            "retrieval service ready"
        );

        Ok(Self {
            documents,
            jobs,
            synthesizer,
            chunker,
            doc_top_k: config.retrieval.doc_top_k,
            job_top_k: config.retrieval.job_top_k,
        })
    }

    // ------------------------------------------------------------------
    // Document chat flow
    // ------------------------------------------------------------------

    /// Extract, chunk, embed, and index one uploaded file.
    pub async fn ingest_document(&self, bytes: &[u8], filename: &str) -> Result<IngestReport> {
        let text = extract_text(bytes, filename).map_err(extraction_error)?;

        let chunks = self.chunker.chunk(&text, filename);
        if chunks.is_empty() {
            return Err(CvMatchError::ValidationError(format!(
                "no indexable content in {filename}"
            )));
        }

        let chunks_indexed = self.documents.add_documents(&chunks).await?;
        Ok(IngestReport {
            filename: filename.to_string(),
            chunks_indexed,
        })
    }

    /// Answer a question grounded in the indexed documents.
    pub async fn chat(&self, question: &str, history: &[ChatMessage]) -> Result<ChatReply> {
        if question.trim().is_empty() {
            return Err(CvMatchError::ValidationError(
                "question must not be empty".to_string(),
            ));
        }

        let sources = self.documents.search(question, self.doc_top_k).await?;
        let answer = self
            .synthesizer
            .answer_question(question, &sources, history)
            .await;

        Ok(ChatReply { answer, sources })
    }

    /// Distinct indexed files with chunk counts.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.documents.list_documents().await
    }

    /// Remove every chunk of one file.
    pub async fn delete_document(&self, filename: &str) -> Result<()> {
        self.documents.delete_document(filename).await
    }

    // ------------------------------------------------------------------
    // CV matching flow
    // ------------------------------------------------------------------

    /// Parse and index job records from a JSON document.
    pub async fn ingest_jobs_json(&self, input: &str) -> Result<usize> {
        let records = parse_jobs_json(input)?;
        self.jobs.add_jobs(&records).await
    }

    /// Index already-parsed job records.
    pub async fn ingest_jobs(&self, records: &[JobRecord]) -> Result<usize> {
        self.jobs.add_jobs(records).await
    }

    /// Match an uploaded CV against the job collection and explain the
    /// result. The analysis degrades to a canned notice when the LLM is
    /// unavailable; the ranked matches themselves never depend on it.
    pub async fn match_cv(&self, bytes: &[u8], filename: &str) -> Result<CvMatchReport> {
        let cv_text = extract_text(bytes, filename).map_err(extraction_error)?;

        let matches = self.jobs.search_jobs(&cv_text, self.job_top_k).await?;

        let cv_summary = records::bounded(&cv_text, CV_CONTEXT_LEN);
        let analysis = self
            .synthesizer
            .analyze_matches(&cv_summary, &matches, &[])
            .await;

        Ok(CvMatchReport { matches, analysis })
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Row statistics for the document and job collections.
    pub async fn stats(&self) -> Result<(CollectionStats, CollectionStats)> {
        let doc_stats = self.documents.stats().await?;
        let job_stats = self.jobs.stats().await?;
        Ok((doc_stats, job_stats))
    }

    /// Names of all document collections carrying the configured prefix.
    pub async fn list_app_collections(&self) -> Result<Vec<String>> {
        self.documents.list_app_collections().await
    }

    pub fn document_index(&self) -> &DocumentIndex {
        &self.documents
    }

    pub fn job_index(&self) -> &JobIndex {
        &self.jobs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_keeps_its_kind() {
        let err = extraction_error(ExtractError::UnsupportedFormat("png".to_string()));
        assert!(matches!(err, CvMatchError::UnsupportedFormat(ref ext) if ext == "png"));
    }

    #[test]
    fn test_parse_failures_map_to_extraction_kind() {
        let err = extraction_error(ExtractError::PdfError("bad xref table".to_string()));
        assert!(matches!(err, CvMatchError::Extraction(_)));

        let err = extraction_error(ExtractError::EmptyContent("blank.txt".to_string()));
        assert!(matches!(err, CvMatchError::Extraction(_)));
    }

    #[test]
    fn test_extraction_kinds_stay_apart_from_validation() {
        // callers branch on the variant, not the message text
        let unsupported = extraction_error(ExtractError::UnsupportedFormat("zip".to_string()));
        let validation = CvMatchError::ValidationError("question must not be empty".to_string());
        assert!(!matches!(unsupported, CvMatchError::ValidationError(_)));
        assert!(!matches!(validation, CvMatchError::UnsupportedFormat(_)));
    }
}
