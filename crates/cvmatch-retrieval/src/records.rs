//! Typed rows for the document and job collections
//!
//! Each row pairs an embedding with the scalar payload stored next to it,
//! and knows how to decode itself back out of a raw store hit. Payload
//! strings are truncated to the collection's declared bounds before insert
//! so an oversized value degrades instead of failing the batch.

use cvmatch_core::JobRecord;
use cvmatch_vector::{payload_i64, payload_str, StoreHit, VectorRecord};
use qdrant_client::qdrant::Value;
use std::collections::HashMap;

/// Bound on free-text payload fields (chunk text, job description).
pub const MAX_TEXT_LEN: usize = 65_535;

/// Bound on name-like payload fields (filename, title, company).
pub const MAX_NAME_LEN: usize = 255;

/// Truncate to `max_chars` characters, respecting char boundaries.
pub fn bounded(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

// ============================================================================
// Document chunk row
// ============================================================================

/// One embedded document chunk as stored in the document collection.
#[derive(Debug, Clone)]
pub struct DocumentChunkRecord {
    pub text: String,
    pub filename: String,
    pub chunk_index: i64,
    pub vector: Vec<f32>,
}

impl DocumentChunkRecord {
    pub fn new(
        text: impl Into<String>,
        filename: impl Into<String>,
        chunk_index: i64,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            text: bounded(&text.into(), MAX_TEXT_LEN),
            filename: bounded(&filename.into(), MAX_NAME_LEN),
            chunk_index,
            vector,
        }
    }

    /// Decode the chunk payload of a search hit. Hits missing the text or
    /// filename fields are malformed and skipped by the caller.
    pub fn decode(hit: &StoreHit) -> Option<(String, String, i64)> {
        let text = payload_str(&hit.payload, "text")?;
        let filename = payload_str(&hit.payload, "filename")?;
        let chunk_index = payload_i64(&hit.payload, "chunk_index").unwrap_or(0);
        Some((text, filename, chunk_index))
    }
}

impl VectorRecord for DocumentChunkRecord {
    fn vector(&self) -> &[f32] {
        &self.vector
    }

    fn payload(&self) -> HashMap<String, Value> {
        let mut payload = HashMap::new();
        payload.insert("text".to_string(), self.text.clone().into());
        payload.insert("filename".to_string(), self.filename.clone().into());
        payload.insert("chunk_index".to_string(), self.chunk_index.into());
        payload
    }
}

// ============================================================================
// Job row
// ============================================================================

/// One embedded job posting as stored in the job collection.
///
/// The vector embeds the composite text, not any single field; the payload
/// keeps the individual fields so hits decode back into full records.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub record: JobRecord,
    pub vector: Vec<f32>,
}

impl JobRow {
    pub fn new(record: JobRecord, vector: Vec<f32>) -> Self {
        Self { record, vector }
    }

    /// Decode a job record from a search hit payload. Requires at least the
    /// title; absent optional fields decode as empty.
    pub fn decode(hit: &StoreHit) -> Option<JobRecord> {
        let job_title = payload_str(&hit.payload, "job_title")?;
        let field = |key: &str| payload_str(&hit.payload, key).unwrap_or_default();

        Some(JobRecord {
            job_title,
            company: field("company"),
            description: field("description"),
            required_skills: field("required_skills"),
            experience_level: field("experience_level"),
            education_requirements: field("education_requirements"),
            location: field("location"),
            salary_range: field("salary_range"),
        })
    }
}

impl VectorRecord for JobRow {
    fn vector(&self) -> &[f32] {
        &self.vector
    }

    fn payload(&self) -> HashMap<String, Value> {
        let r = &self.record;
        let mut payload = HashMap::new();
        payload.insert(
            "job_title".to_string(),
            bounded(&r.job_title, MAX_NAME_LEN).into(),
        );
        payload.insert(
            "company".to_string(),
            bounded(&r.company, MAX_NAME_LEN).into(),
        );
        payload.insert(
            "description".to_string(),
            bounded(&r.description, MAX_TEXT_LEN).into(),
        );
        payload.insert(
            "required_skills".to_string(),
            bounded(&r.required_skills, MAX_TEXT_LEN).into(),
        );
        payload.insert(
            "experience_level".to_string(),
            bounded(&r.experience_level, MAX_NAME_LEN).into(),
        );
        payload.insert(
            "education_requirements".to_string(),
            bounded(&r.education_requirements, MAX_NAME_LEN).into(),
        );
        payload.insert(
            "location".to_string(),
            bounded(&r.location, MAX_NAME_LEN).into(),
        );
        payload.insert(
            "salary_range".to_string(),
            bounded(&r.salary_range, MAX_NAME_LEN).into(),
        );
        payload
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with(fields: &[(&str, &str)]) -> StoreHit {
        let mut payload: HashMap<String, Value> = HashMap::new();
        for (k, v) in fields {
            payload.insert(k.to_string(), v.to_string().into());
        }
        StoreHit {
            id: "test".to_string(),
            similarity: 0.8,
            payload,
        }
    }

    #[test]
    fn test_document_record_payload_round_trip() {
        let record = DocumentChunkRecord::new("chunk body", "cv.pdf", 2, vec![0.1, 0.2]);
        let payload = record.payload();

        let hit = StoreHit {
            id: "x".to_string(),
            similarity: 0.9,
            payload,
        };
        let (text, filename, index) = DocumentChunkRecord::decode(&hit).unwrap();
        assert_eq!(text, "chunk body");
        assert_eq!(filename, "cv.pdf");
        assert_eq!(index, 2);
    }

    #[test]
    fn test_document_decode_requires_text_and_filename() {
        assert!(DocumentChunkRecord::decode(&hit_with(&[("filename", "a.pdf")])).is_none());
        assert!(DocumentChunkRecord::decode(&hit_with(&[("text", "body")])).is_none());
    }

    #[test]
    fn test_oversized_fields_are_bounded() {
        let record = DocumentChunkRecord::new("x".repeat(70_000), "n".repeat(300), 0, vec![]);
        assert_eq!(record.text.chars().count(), MAX_TEXT_LEN);
        assert_eq!(record.filename.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_job_row_payload_round_trip() {
        let record = JobRecord {
            job_title: "Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Build things".to_string(),
            required_skills: "Rust".to_string(),
            experience_level: "Senior".to_string(),
            education_requirements: "BSc".to_string(),
            location: "Riyadh".to_string(),
            salary_range: "10k".to_string(),
        };
        let row = JobRow::new(record.clone(), vec![0.5]);
        let hit = StoreHit {
            id: "x".to_string(),
            similarity: 0.7,
            payload: row.payload(),
        };

        let decoded = JobRow::decode(&hit).unwrap();
        assert_eq!(decoded.job_title, record.job_title);
        assert_eq!(decoded.salary_range, record.salary_range);
    }

    #[test]
    fn test_job_decode_requires_title() {
        assert!(JobRow::decode(&hit_with(&[("description", "d")])).is_none());
    }

    #[test]
    fn test_job_decode_missing_optionals_are_empty() {
        let decoded = JobRow::decode(&hit_with(&[("job_title", "Engineer")])).unwrap();
        assert_eq!(decoded.job_title, "Engineer");
        assert!(decoded.company.is_empty());
        assert!(decoded.location.is_empty());
    }
}
