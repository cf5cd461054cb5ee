//! Prompt assembly for answer synthesis and job-match analysis
//!
//! All prompts are built from a shared `PromptBuilder` so the section layout
//! stays uniform: system instruction, context, conversation, question,
//! numbered instructions.

use cvmatch_core::{ChatMessage, DocumentHit, JobMatch};

/// Context documents included in a document-answer prompt.
const MAX_CONTEXT_DOCS: usize = 5;

/// Job candidates included in an analysis prompt.
const MAX_CONTEXT_JOBS: usize = 5;

/// Trailing conversation turns carried into a document-answer prompt.
const MAX_CHAT_HISTORY: usize = 6;

/// Trailing conversation turns carried into a job-analysis prompt.
const MAX_JOB_HISTORY: usize = 4;

/// Job description length cap inside prompts, keeps per-job context bounded.
const JOB_DESCRIPTION_PREVIEW: usize = 200;

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for sectioned LLM prompts
pub struct PromptBuilder {
    system_instruction: String,
    context_sections: Vec<String>,
    history: Vec<ChatMessage>,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self {
            system_instruction: String::new(),
            context_sections: Vec::new(),
            history: Vec::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Set system instruction
    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Append the trailing `limit` turns of a conversation
    pub fn history(mut self, messages: &[ChatMessage], limit: usize) -> Self {
        let start = messages.len().saturating_sub(limit);
        self.history.extend_from_slice(&messages[start..]);
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.system_instruction.is_empty() {
            prompt.push_str("<s>\n");
            prompt.push_str(&self.system_instruction);
            prompt.push_str("\n</s>\n\n");
        }

        if !self.context_sections.is_empty() {
            prompt.push_str("<context>\n");
            for section in &self.context_sections {
                prompt.push_str(section);
                prompt.push_str("\n\n");
            }
            prompt.push_str("</context>\n\n");
        }

        if !self.history.is_empty() {
            prompt.push_str("<conversation>\n");
            for message in &self.history {
                prompt.push_str(&format!("{}: {}\n", message.role, message.content));
            }
            prompt.push_str("</conversation>\n\n");
        }

        if !self.question.is_empty() {
            prompt.push_str("<question>\n");
            prompt.push_str(&self.question);
            prompt.push_str("\n</question>\n\n");
        }

        if !self.instructions.is_empty() {
            prompt.push_str("<instructions>\n");
            for (i, inst) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, inst));
            }
            prompt.push_str("</instructions>\n");
        }

        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Prompt templates
// ============================================================================

/// Prompt for answering a question grounded in retrieved document chunks.
///
/// Hits beyond the context cap are dropped; an empty hit list produces an
/// explicit no-documents notice so the model declines instead of inventing.
pub fn document_answer_prompt(
    question: &str,
    hits: &[DocumentHit],
    history: &[ChatMessage],
) -> String {
    let mut builder = PromptBuilder::new()
        .system(
            "You are a helpful assistant that answers questions based on the \
             provided context documents. If the answer is not in the context, \
             say so politely.",
        )
        .history(history, MAX_CHAT_HISTORY)
        .question(question)
        .add_instruction("Use only the context documents to answer")
        .add_instruction("Cite the relevant documents by filename when possible")
        .add_instruction("Be concise but comprehensive");

    if hits.is_empty() {
        builder = builder.add_context(
            "No relevant documents found. Explain that documents need to be uploaded first.",
        );
    } else {
        for hit in hits.iter().take(MAX_CONTEXT_DOCS) {
            builder = builder.add_context(format!(
                "Document: {}\nContent: {}",
                hit.filename, hit.text
            ));
        }
    }

    builder.build()
}

/// Prompt asking for a career analysis of a candidate against matched jobs.
pub fn job_analysis_prompt(
    cv_summary: &str,
    matches: &[JobMatch],
    history: &[ChatMessage],
) -> String {
    let mut builder = PromptBuilder::new()
        .system(
            "You are a career advisor helping job seekers find suitable \
             employment based on their CV and the available job positions. \
             Be encouraging and professional, and focus on skills alignment, \
             experience level, and career growth potential.",
        )
        .add_context(format!("CANDIDATE CV SUMMARY:\n{cv_summary}"))
        .history(history, MAX_JOB_HISTORY)
        .question("Analyze this candidate's CV against the listed job opportunities.")
        .add_instruction("Summarize the candidate's profile briefly")
        .add_instruction("Explain the top matches with specific reasons and match percentages")
        .add_instruction("Suggest concrete ways to improve the candidate's prospects");

    if matches.is_empty() {
        builder = builder.add_context("AVAILABLE JOB OPPORTUNITIES:\nNo job matches found.");
    } else {
        let jobs = matches
            .iter()
            .take(MAX_CONTEXT_JOBS)
            .enumerate()
            .map(|(i, m)| format_job(i + 1, m))
            .collect::<Vec<_>>()
            .join("\n");
        builder = builder.add_context(format!("AVAILABLE JOB OPPORTUNITIES:\n{jobs}"));
    }

    builder.build()
}

fn format_job(number: usize, m: &JobMatch) -> String {
    format!(
        "Job {number}:\n\
         - Title: {}\n\
         - Company: {}\n\
         - Match Score: {:.0}%\n\
         - Description: {}\n\
         - Required Skills: {}\n\
         - Experience Level: {}\n\
         - Education: {}\n\
         - Location: {}\n\
         - Salary: {}\n",
        m.job.job_title,
        m.job.company,
        m.match_score,
        truncate(&m.job.description, JOB_DESCRIPTION_PREVIEW),
        m.job.required_skills,
        m.job.experience_level,
        m.job.education_requirements,
        m.job.location,
        m.job.salary_range,
    )
}

/// Prompt asking the model to rescore job candidates against a CV.
///
/// The expected reply is a bare JSON array of numbers, one per candidate,
/// each in 0-100, in candidate order.
pub fn rerank_prompt(cv_text: &str, matches: &[JobMatch]) -> String {
    let jobs = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "{}. {} at {}: {}",
                i + 1,
                m.job.job_title,
                m.job.company,
                truncate(&m.job.description, JOB_DESCRIPTION_PREVIEW)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    PromptBuilder::new()
        .system(
            "You are a recruiting expert scoring how well a candidate fits \
             each job. Respond with only a JSON array of numbers.",
        )
        .add_context(format!("CANDIDATE CV:\n{cv_text}"))
        .add_context(format!("JOBS:\n{jobs}"))
        .question(format!(
            "Score the candidate's fit for each of the {} jobs above.",
            matches.len()
        ))
        .add_instruction("Return a JSON array of numbers, one score per job, in order")
        .add_instruction("Each score must be between 0 and 100")
        .add_instruction("Do not include any text outside the JSON array")
        .build()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{prefix}...")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cvmatch_core::JobRecord;

    fn sample_match(title: &str, score: f32) -> JobMatch {
        JobMatch {
            job: JobRecord {
                job_title: title.to_string(),
                company: "Acme".to_string(),
                description: "Build and operate backend services".to_string(),
                required_skills: "Rust, SQL".to_string(),
                experience_level: "3+ years".to_string(),
                education_requirements: "BSc".to_string(),
                location: "Riyadh".to_string(),
                salary_range: "10k-15k".to_string(),
            },
            match_score: score,
        }
    }

    #[test]
    fn test_prompt_builder_sections() {
        let prompt = PromptBuilder::new()
            .system("You are a helpful assistant.")
            .add_context("[1] Context from document A")
            .question("What is the answer?")
            .add_instruction("Be concise")
            .add_instruction("Cite sources")
            .build();

        assert!(prompt.contains("<s>"));
        assert!(prompt.contains("You are a helpful assistant."));
        assert!(prompt.contains("<context>"));
        assert!(prompt.contains("What is the answer?"));
        assert!(prompt.contains("1. Be concise"));
        assert!(prompt.contains("2. Cite sources"));
    }

    #[test]
    fn test_history_keeps_only_trailing_turns() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::user(format!("message {i}")))
            .collect();

        let prompt = PromptBuilder::new()
            .history(&history, 3)
            .question("q")
            .build();

        assert!(!prompt.contains("message 6"));
        assert!(prompt.contains("message 7"));
        assert!(prompt.contains("message 9"));
    }

    #[test]
    fn test_document_prompt_caps_context() {
        let hits: Vec<DocumentHit> = (0..8)
            .map(|i| DocumentHit {
                text: format!("chunk body {i}"),
                filename: format!("doc{i}.pdf"),
                chunk_index: i,
                score: 90.0,
            })
            .collect();

        let prompt = document_answer_prompt("what?", &hits, &[]);
        assert!(prompt.contains("doc0.pdf"));
        assert!(prompt.contains("doc4.pdf"));
        assert!(!prompt.contains("doc5.pdf"));
    }

    #[test]
    fn test_document_prompt_without_hits_notes_absence() {
        let prompt = document_answer_prompt("what?", &[], &[]);
        assert!(prompt.contains("No relevant documents found"));
    }

    #[test]
    fn test_job_prompt_truncates_descriptions() {
        let mut m = sample_match("Engineer", 82.0);
        m.job.description = "x".repeat(500);
        let prompt = job_analysis_prompt("summary", &[m], &[]);

        assert!(prompt.contains(&"x".repeat(JOB_DESCRIPTION_PREVIEW)));
        assert!(!prompt.contains(&"x".repeat(JOB_DESCRIPTION_PREVIEW + 1)));
        assert!(prompt.contains("..."));
    }

    #[test]
    fn test_rerank_prompt_lists_all_candidates() {
        let matches = vec![sample_match("Engineer", 70.0), sample_match("Analyst", 60.0)];
        let prompt = rerank_prompt("cv text", &matches);

        assert!(prompt.contains("1. Engineer at Acme"));
        assert!(prompt.contains("2. Analyst at Acme"));
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("2 jobs"));
    }
}
