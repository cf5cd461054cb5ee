//! LLM-based rescoring of job candidates
//!
//! Takes the similarity-ranked candidate list and asks the model for a fit
//! score per candidate. Rescoring never changes which candidates are in the
//! set or how many there are; it only replaces scores. Failures are returned
//! to the caller, who decides whether to keep the original scores.

use cvmatch_core::{JobMatch, LlmClient};
use thiserror::Error;

use crate::prompt::rerank_prompt;

/// Errors from the rescoring path.
///
/// Kept separate from the main error type so callers can treat every variant
/// as the same soft failure without inspecting store or config errors.
#[derive(Error, Debug)]
pub enum RerankError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Unparseable score response: {0}")]
    Parse(String),
}

/// Ask the model to rescore `matches` against `cv_text`.
///
/// Returns one score per candidate, in candidate order, each clamped to
/// 0-100. If the model returns more scores than candidates the extras are
/// dropped; if it returns fewer, only the covered prefix is returned and the
/// caller keeps original scores for the rest.
pub async fn rescore(
    llm: &dyn LlmClient,
    cv_text: &str,
    matches: &[JobMatch],
) -> Result<Vec<f32>, RerankError> {
    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = rerank_prompt(cv_text, matches);
    let response = llm
        .generate(&prompt)
        .await
        .map_err(|e| RerankError::Llm(e.to_string()))?;

    let mut scores = parse_score_array(&response)?;
    scores.truncate(matches.len());
    for score in &mut scores {
        *score = score.clamp(0.0, 100.0);
    }

    tracing::debug!(
        candidates = matches.len(),
        scored = scores.len(),
        "rescored candidates"
    );
    Ok(scores)
}

/// Extract a JSON number array from a model reply.
///
/// Models often wrap the array in prose or code fences, so the parse targets
/// the first '['..']' span rather than the whole reply.
fn parse_score_array(response: &str) -> Result<Vec<f32>, RerankError> {
    let start = response
        .find('[')
        .ok_or_else(|| RerankError::Parse(format!("no array in response: {response}")))?;
    let end = response[start..]
        .find(']')
        .map(|i| start + i + 1)
        .ok_or_else(|| RerankError::Parse(format!("unterminated array in response: {response}")))?;

    let scores: Vec<f32> = serde_json::from_str(&response[start..end])
        .map_err(|e| RerankError::Parse(format!("invalid score array: {e}")))?;

    Ok(scores)
}

// ============================================================================
// Tests
// ============================================================================
