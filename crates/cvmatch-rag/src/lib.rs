//! CVMatch RAG - Answer synthesis over retrieved context
//!
//! Combines an LLM client with prompt templates to produce grounded answers
//! for document questions, career analyses for CV-to-job matching, and
//! rescored candidate lists.

use cvmatch_core::{ChatMessage, DocumentHit, JobMatch, LlmClient, Result};
use std::sync::Arc;

pub mod llm;
pub mod prompt;
pub mod rerank;

pub use llm::{create_llm_client, OllamaClient, OpenAiClient};
pub use prompt::{document_answer_prompt, job_analysis_prompt, rerank_prompt, PromptBuilder};
pub use rerank::{rescore, RerankError};

/// Canned reply used when the LLM is unavailable, so a chat turn degrades
/// to a notice instead of an error page. Retrieval itself is unaffected.
pub const FALLBACK_MESSAGE: &str = "I apologize, but I'm currently unable to process \
your request due to a technical issue with the AI service. However, I can still help \
you with job matching through the CV upload feature.";

/// Generation front end: owns the LLM client and the degradation policy.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Answer a question grounded in retrieved document chunks.
    ///
    /// LLM failures degrade to `FALLBACK_MESSAGE` with a warning; retrieval
    /// already succeeded by this point and its results are not discarded.
    pub async fn answer_question(
        &self,
        question: &str,
        hits: &[DocumentHit],
        history: &[ChatMessage],
    ) -> String {
        let prompt = document_answer_prompt(question, hits, history);
        match self.llm.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "answer generation failed, using fallback");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Produce a career analysis of a candidate against matched jobs.
    pub async fn analyze_matches(
        &self,
        cv_summary: &str,
        matches: &[JobMatch],
        history: &[ChatMessage],
    ) -> String {
        let prompt = job_analysis_prompt(cv_summary, matches, history);
        match self.llm.generate(&prompt).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(error = %e, "match analysis failed, using fallback");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Summarize a text to roughly `max_length` characters.
    ///
    /// Falls back to plain truncation when the LLM is unavailable.
    pub async fn summarize(&self, text: &str, max_length: usize) -> String {
        let prompt = PromptBuilder::new()
            .system(format!(
                "Summarize the following text in no more than {max_length} characters. \
                 Be concise and capture the key points."
            ))
            .add_context(text)
            .build();

        match self.llm.generate(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed, truncating instead");
                if text.chars().count() > max_length {
                    let prefix: String = text.chars().take(max_length).collect();
                    format!("{prefix}...")
                } else {
                    text.to_string()
                }
            }
        }
    }

    /// Rescore job candidates against the full CV text.
    ///
    /// Unlike the chat paths this surfaces the error: the caller owns the
    /// decision to keep similarity scores when rescoring fails.
    pub async fn rescore_matches(
        &self,
        cv_text: &str,
        matches: &[JobMatch],
    ) -> std::result::Result<Vec<f32>, RerankError> {
        rescore(self.llm.as_ref(), cv_text, matches).await
    }

    /// Direct generation passthrough for callers composing their own prompts.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.llm.generate(prompt).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoLlm;

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo:{}", prompt.len()))
        }
    }

    struct DownLlm;

    #[async_trait]
    impl LlmClient for DownLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(cvmatch_core::CvMatchError::LlmError("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_answer_question_uses_llm_reply() {
        let synth = Synthesizer::new(Arc::new(EchoLlm));
        let answer = synth.answer_question("what?", &[], &[]).await;
        assert!(answer.starts_with("echo:"));
    }

    #[tokio::test]
    async fn test_answer_question_degrades_to_fallback() {
        let synth = Synthesizer::new(Arc::new(DownLlm));
        let answer = synth.answer_question("what?", &[], &[]).await;
        assert_eq!(answer, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_summarize_truncates_when_llm_down() {
        let synth = Synthesizer::new(Arc::new(DownLlm));
        let long_text = "word ".repeat(100);
        let summary = synth.summarize(&long_text, 50).await;
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= 53);
    }

    #[tokio::test]
    async fn test_summarize_short_text_passes_through_when_llm_down() {
        let synth = Synthesizer::new(Arc::new(DownLlm));
        let summary = synth.summarize("short", 50).await;
        assert_eq!(summary, "short");
    }

    #[tokio::test]
    async fn test_rescore_error_is_surfaced_not_swallowed() {
        let synth = Synthesizer::new(Arc::new(DownLlm));
        let m = vec![JobMatch {
            job: cvmatch_core::JobRecord::default(),
            match_score: 40.0,
        }];
        assert!(synth.rescore_matches("cv", &m).await.is_err());
    }
}
