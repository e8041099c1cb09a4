//! Exam analysis pipeline — four chained prompt stages.
//!
//! Flow: syllabus_parse ─┐
//!                       ├→ frequency_analysis → question_generation
//!       question_paper_parse ─┘
//!
//! Stages 1 and 2 share no data and may run concurrently. Stage 3 needs both,
//! stage 4 needs stages 2 and 3. Nothing is returned unless all four succeed.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::analysis::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, GENERATION_PROMPT_TEMPLATE, GENERATION_SYSTEM,
    QUESTION_PAPER_PROMPT_TEMPLATE, QUESTION_PAPER_SYSTEM, SYLLABUS_PROMPT_TEMPLATE,
    SYLLABUS_SYSTEM,
};
use crate::intake::documents::ExamDocuments;
use crate::llm_client::prompts::{CONTENT_ONLY_INSTRUCTION, EXTRACTED_TEXT_NOTICE};
use crate::llm_client::{LlmError, TextGenerator};

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SyllabusParse,
    QuestionPaperParse,
    FrequencyAnalysis,
    QuestionGeneration,
}

impl Stage {
    #[cfg(test)]
    pub const ALL: [Stage; 4] = [
        Stage::SyllabusParse,
        Stage::QuestionPaperParse,
        Stage::FrequencyAnalysis,
        Stage::QuestionGeneration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::SyllabusParse => "syllabus_parse",
            Stage::QuestionPaperParse => "question_paper_parse",
            Stage::FrequencyAnalysis => "frequency_analysis",
            Stage::QuestionGeneration => "question_generation",
        }
    }

    /// Full system prompt sent with this stage's call.
    pub fn system_prompt(self) -> String {
        match self {
            Stage::SyllabusParse => {
                format!("{SYLLABUS_SYSTEM} {EXTRACTED_TEXT_NOTICE} {CONTENT_ONLY_INSTRUCTION}")
            }
            Stage::QuestionPaperParse => {
                format!("{QUESTION_PAPER_SYSTEM} {EXTRACTED_TEXT_NOTICE} {CONTENT_ONLY_INSTRUCTION}")
            }
            Stage::FrequencyAnalysis => format!("{ANALYSIS_SYSTEM} {CONTENT_ONLY_INSTRUCTION}"),
            Stage::QuestionGeneration => format!("{GENERATION_SYSTEM} {CONTENT_ONLY_INSTRUCTION}"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A stage failed; carries which one and the provider-level cause.
#[derive(Debug, Error)]
#[error("Error during {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: LlmError,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub concurrent_parse: bool,
}

/// Final output of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub exam_analysis: String,
    pub practice_questions: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs all four stages against one credential-bound generator.
///
/// Sequential mode issues stage 2 only after stage 1 succeeded, so an early
/// failure makes no further calls. Concurrent mode joins stages 1 and 2 and
/// drops the sibling call on the first error.
pub async fn run_pipeline(
    generator: &dyn TextGenerator,
    documents: &ExamDocuments,
    options: PipelineOptions,
) -> Result<PipelineResult, PipelineError> {
    let syllabus_prompt = fill_template(
        SYLLABUS_PROMPT_TEMPLATE,
        &[("syllabus_text", &documents.syllabus.text)],
    );
    let papers_json = documents.question_papers.to_prompt_json();
    let papers_prompt = fill_template(
        QUESTION_PAPER_PROMPT_TEMPLATE,
        &[("question_papers", &papers_json)],
    );

    let (syllabus_structure, question_history) = if options.concurrent_parse {
        tokio::try_join!(
            run_stage(generator, Stage::SyllabusParse, &syllabus_prompt),
            run_stage(generator, Stage::QuestionPaperParse, &papers_prompt),
        )?
    } else {
        let syllabus = run_stage(generator, Stage::SyllabusParse, &syllabus_prompt).await?;
        let papers = run_stage(generator, Stage::QuestionPaperParse, &papers_prompt).await?;
        (syllabus, papers)
    };

    let analysis_prompt = fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("syllabus_structure", &syllabus_structure),
            ("question_history", &question_history),
        ],
    );
    let exam_analysis = run_stage(generator, Stage::FrequencyAnalysis, &analysis_prompt).await?;

    let generation_prompt = fill_template(
        GENERATION_PROMPT_TEMPLATE,
        &[
            ("question_patterns", &question_history),
            ("topic_analysis", &exam_analysis),
        ],
    );
    let practice_questions =
        run_stage(generator, Stage::QuestionGeneration, &generation_prompt).await?;

    Ok(PipelineResult {
        exam_analysis,
        practice_questions,
    })
}

async fn run_stage(
    generator: &dyn TextGenerator,
    stage: Stage,
    prompt: &str,
) -> Result<String, PipelineError> {
    info!("Stage {stage} started ({} prompt chars)", prompt.len());
    let started = Instant::now();

    match generator.generate(&stage.system_prompt(), prompt).await {
        Ok(text) => {
            info!(
                "Stage {stage} finished in {}ms ({} chars)",
                started.elapsed().as_millis(),
                text.len()
            );
            Ok(text)
        }
        Err(source) => {
            error!("Stage {stage} failed: {source}");
            Err(PipelineError { stage, source })
        }
    }
}

/// Substitutes `{name}` slots in one pass, so text inserted for one slot is
/// never scanned for another. Unknown braces are kept as-is.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let extra: usize = slots.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let slot = slots
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
