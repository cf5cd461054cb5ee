//! Job collection index and CV-to-job matching
//!
//! Jobs are embedded as a composite of their descriptive fields and matched
//! against full CV text by similarity, with an optional LLM rescoring pass
//! that adjusts scores but never the candidate set.

use cvmatch_core::{CvMatchError, JobMatch, JobRecord, Result};
use cvmatch_rag::Synthesizer;
use cvmatch_vector::{match_score, Embedder, QdrantStore};
use std::sync::Arc;

use crate::records::JobRow;

/// Index over the job posting collection.
pub struct JobIndex {
    store: QdrantStore,
    embedder: Arc<Embedder>,
    synthesizer: Option<Arc<Synthesizer>>,
    rerank_enabled: bool,
}

impl JobIndex {
    /// Bind an index to a store and embedder, without rescoring.
    pub fn new(store: QdrantStore, embedder: Arc<Embedder>) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(CvMatchError::SchemaViolation(format!(
                "embedder dimension {} does not match collection {} dimension {}",
                embedder.dimension(),
                store.collection(),
                store.dimension()
            )));
        }
        Ok(Self {
            store,
            embedder,
            synthesizer: None,
            rerank_enabled: false,
        })
    }

    /// Enable LLM rescoring of match results.
    pub fn with_rescoring(mut self, synthesizer: Arc<Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self.rerank_enabled = true;
        self
    }

    /// Embed and insert job records. Invalid records (missing title or
    /// description) are skipped with a warning, not a batch failure.
    /// Returns the number actually inserted.
    pub async fn add_jobs(&self, jobs: &[JobRecord]) -> Result<usize> {
        let valid: Vec<&JobRecord> = jobs.iter().filter(|j| j.is_valid()).collect();
        let skipped = jobs.len() - valid.len();
        if skipped > 0 {
            tracing::warn!(skipped, "skipped job records missing title or description");
        }
        if valid.is_empty() {
            return Ok(0);
        }

        let composites: Vec<String> = valid.iter().map(|j| j.composite_text()).collect();
        let vectors = self.embedder.encode(&composites).await?;

        let rows: Vec<JobRow> = valid
            .into_iter()
            .zip(vectors)
            .map(|(job, vector)| JobRow::new(job.clone(), vector))
            .collect();

        let inserted = self.store.insert(&rows).await?;
        tracing::info!(
            collection = %self.store.collection(),
            jobs = inserted,
            "indexed job records"
        );
        Ok(inserted)
    }

    /// Match a CV against the job collection, best first, scores 0-100.
    ///
    /// When rescoring is enabled and succeeds, the LLM scores replace the
    /// similarity scores for the covered prefix and the list is reordered.
    /// When rescoring fails the similarity scores stand; matching never
    /// fails because the rescoring model did.
    pub async fn search_jobs(&self, cv_text: &str, top_k: usize) -> Result<Vec<JobMatch>> {
        let cv_vector = self.embedder.encode_one(cv_text).await?;
        let hits = self.store.search(&cv_vector, top_k).await?;

        let mut matches: Vec<JobMatch> = hits
            .iter()
            .filter_map(|hit| {
                let job = JobRow::decode(hit)?;
                Some(JobMatch {
                    job,
                    match_score: match_score(hit.similarity),
                })
            })
            .collect();

        if self.rerank_enabled {
            if let Some(ref synthesizer) = self.synthesizer {
                match synthesizer.rescore_matches(cv_text, &matches).await {
                    Ok(scores) => {
                        for (m, score) in matches.iter_mut().zip(scores) {
                            m.match_score = score;
                        }
                        matches.sort_by(|a, b| {
                            b.match_score
                                .partial_cmp(&a.match_score)
                                .unwrap_or(std::cmp::Ordering::Equal)
                        });
                        tracing::debug!(candidates = matches.len(), "applied rescored matches");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "rescoring failed, keeping similarity scores");
                    }
                }
            }
        }

        Ok(matches)
    }

    /// Row statistics for the job collection.
    pub async fn stats(&self) -> Result<cvmatch_core::CollectionStats> {
        self.store.stats().await
    }

    pub fn collection(&self) -> &str {
        self.store.collection()
    }
}

/// Parse job records from a JSON document.
///
/// Accepts a bare array, an object with a `jobs` array, or a single record.
/// Entries that fail to deserialize or lack title/description are skipped
/// with a warning; an input yielding no valid records is an error.
pub fn parse_jobs_json(input: &str) -> Result<Vec<JobRecord>> {
    let value: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| CvMatchError::ValidationError(format!("invalid jobs JSON: {e}")))?;

    let entries: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("jobs") {
            Some(serde_json::Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![serde_json::Value::Object(map)],
        },
        other => {
            return Err(CvMatchError::ValidationError(format!(
                "expected a job object or array, got {other}"
            )))
        }
    };

    let total = entries.len();
    let jobs: Vec<JobRecord> = entries
        .into_iter()
        .map(stringify_scalars)
        .filter_map(|entry| match serde_json::from_value::<JobRecord>(entry) {
            Ok(job) if job.is_valid() => Some(job),
            Ok(job) => {
                tracing::warn!(title = %job.job_title, "skipped job missing required fields");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipped unparseable job entry");
                None
            }
        })
        .collect();

    if jobs.is_empty() {
        return Err(CvMatchError::ValidationError(format!(
            "no valid job records among {total} entries"
        )));
    }

    Ok(jobs)
}

/// Coerce scalar values inside a job object to strings, so sources that
/// export salaries or experience as numbers still parse.
fn stringify_scalars(entry: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match entry {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::Number(n) => Value::String(n.to_string()),
                        Value::Bool(b) => Value::String(b.to_string()),
                        other => other,
                    };
                    (k, v)
                })
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let jobs = parse_jobs_json(
            r#"[
                {"job_title": "Engineer", "description": "Build"},
                {"job_title": "Analyst", "description": "Analyze"}
            ]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_title, "Engineer");
    }

    #[test]
    fn test_parse_wrapped_jobs_object() {
        let jobs = parse_jobs_json(
            r#"{"jobs": [{"job_title": "Engineer", "description": "Build"}]}"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn test_parse_single_object() {
        let jobs =
            parse_jobs_json(r#"{"job_title": "Engineer", "description": "Build"}"#).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn test_parse_accepts_aliased_field_names() {
        let jobs = parse_jobs_json(
            r#"[{"title": "Engineer", "description": "Build", "skills": "Rust"}]"#,
        )
        .unwrap();
        assert_eq!(jobs[0].job_title, "Engineer");
        assert_eq!(jobs[0].required_skills, "Rust");
    }

    #[test]
    fn test_parse_stringifies_scalar_fields() {
        let jobs = parse_jobs_json(
            r#"[{"job_title": "Engineer", "description": "Build", "salary_range": 12000}]"#,
        )
        .unwrap();
        assert_eq!(jobs[0].salary_range, "12000");
    }

    #[test]
    fn test_parse_skips_invalid_entries() {
        let jobs = parse_jobs_json(
            r#"[
                {"job_title": "Engineer", "description": "Build"},
                {"job_title": "", "description": "No title"},
                {"company": "Acme"}
            ]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn test_parse_all_invalid_is_error() {
        assert!(matches!(
            parse_jobs_json(r#"[{"company": "Acme"}]"#),
            Err(CvMatchError::ValidationError(_))
        ));
    }

    #[test]
    fn test_parse_rejects_scalars() {
        assert!(parse_jobs_json("42").is_err());
        assert!(parse_jobs_json("not json").is_err());
    }
}
