//! Request documents: one syllabus plus an ordered set of question papers.
//!
//! Everything here lives for a single request and is dropped with it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::intake::extract::{ExtractionError, TextExtractor};

/// One uploaded file, as received from the multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Extracted syllabus text.
#[derive(Debug, Clone)]
pub struct SyllabusDocument {
    pub text: String,
}

/// Extracted question-paper text keyed by upload position.
///
/// Serializes as a JSON object (`{"0": "...", "1": "..."}`), which is how the
/// set is shown to the question-paper stage.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct QuestionPaperSet {
    papers: BTreeMap<usize, String>,
}

impl QuestionPaperSet {
    pub fn insert(&mut self, index: usize, text: String) {
        self.papers.insert(index, text);
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    /// True when at least one paper has non-whitespace text.
    pub fn has_content(&self) -> bool {
        self.papers.values().any(|t| !t.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &String)> {
        self.papers.iter()
    }

    /// Renders the set for inclusion in a prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.papers).unwrap_or_default()
    }
}

impl FromIterator<(usize, String)> for QuestionPaperSet {
    fn from_iter<I: IntoIterator<Item = (usize, String)>>(iter: I) -> Self {
        Self {
            papers: iter.into_iter().collect(),
        }
    }
}

/// What to do when some question papers fail extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionPaperPolicy {
    /// Any unreadable paper fails the whole request.
    #[default]
    Abort,
    /// Unreadable papers are dropped; the rest go through.
    Skip,
}

#[derive(Debug, Error)]
#[error("unknown question paper policy '{0}' (expected 'abort' or 'skip')")]
pub struct UnknownPolicy(String);

impl FromStr for QuestionPaperPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for QuestionPaperPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{file}: {source}")]
    Extraction {
        file: String,
        #[source]
        source: ExtractionError,
    },

    #[error("{0}")]
    EmptyInput(String),
}

/// The validated inputs of one analysis request.
#[derive(Debug, Clone)]
pub struct ExamDocuments {
    pub syllabus: SyllabusDocument,
    pub question_papers: QuestionPaperSet,
}

/// Extracts every upload and checks that both inputs carry text.
///
/// Runs before any pipeline stage, so a failure here costs no provider calls.
pub async fn collect_documents(
    extractor: &dyn TextExtractor,
    syllabus: Upload,
    question_files: Vec<Upload>,
    policy: QuestionPaperPolicy,
) -> Result<ExamDocuments, IntakeError> {
    let syllabus_text = extractor
        .extract(syllabus.bytes)
        .await
        .map_err(|source| IntakeError::Extraction {
            file: syllabus.file_name,
            source,
        })?;

    if syllabus_text.trim().is_empty() {
        return Err(IntakeError::EmptyInput(
            "Failed to extract text from the syllabus file.".to_string(),
        ));
    }

    let mut question_papers = QuestionPaperSet::default();
    for (index, upload) in question_files.into_iter().enumerate() {
        match extractor.extract(upload.bytes).await {
            Ok(text) => question_papers.insert(index, text),
            Err(source) if policy == QuestionPaperPolicy::Skip => {
                warn!(
                    "Skipping question paper #{index} ({}): {source}",
                    upload.file_name
                );
            }
            Err(source) => {
                return Err(IntakeError::Extraction {
                    file: upload.file_name,
                    source,
                })
            }
        }
    }

    if !question_papers.has_content() {
        return Err(IntakeError::EmptyInput(
            "Failed to extract text from the question paper files.".to_string(),
        ));
    }

    Ok(ExamDocuments {
        syllabus: SyllabusDocument {
            text: syllabus_text,
        },
        question_papers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{upload, Utf8Extractor};

    #[test]
    fn test_policy_parses_case_insensitively() {
        assert_eq!("Skip".parse::<QuestionPaperPolicy>().unwrap(), QuestionPaperPolicy::Skip);
        assert_eq!("abort".parse::<QuestionPaperPolicy>().unwrap(), QuestionPaperPolicy::Abort);
        assert!("retry".parse::<QuestionPaperPolicy>().is_err());
    }

    #[test]
    fn test_paper_set_renders_json_keyed_by_index() {
        let set: QuestionPaperSet = [(1, "Q1. Define a heap.".to_string()), (0, "Q1. Sort.".to_string())]
            .into_iter()
            .collect();
        let value: serde_json::Value = serde_json::from_str(&set.to_prompt_json()).unwrap();
        assert_eq!(value["0"], "Q1. Sort.");
        assert_eq!(value["1"], "Q1. Define a heap.");
    }

    #[test]
    fn test_has_content_ignores_whitespace_papers() {
        let set: QuestionPaperSet = [(0, "  \n".to_string()), (1, String::new())]
            .into_iter()
            .collect();
        assert!(!set.has_content());
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_collect_keeps_upload_order() {
        let docs = collect_documents(
            &Utf8Extractor,
            upload("syllabus.pdf", "Unit 1: Arrays"),
            vec![upload("2022.pdf", "Q1. A"), upload("2023.pdf", "Q1. B")],
            QuestionPaperPolicy::Abort,
        )
        .await
        .unwrap();

        assert_eq!(docs.syllabus.text, "Unit 1: Arrays");
        let papers: Vec<_> = docs.question_papers.iter().collect();
        assert_eq!(papers, vec![(&0, &"Q1. A".to_string()), (&1, &"Q1. B".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_rejects_empty_syllabus() {
        let result = collect_documents(
            &Utf8Extractor,
            upload("syllabus.pdf", "   "),
            vec![upload("2022.pdf", "Q1. A")],
            QuestionPaperPolicy::Abort,
        )
        .await;
        assert!(matches!(result, Err(IntakeError::EmptyInput(_))));
    }

    #[tokio::test]
    async fn test_collect_rejects_all_empty_papers() {
        let result = collect_documents(
            &Utf8Extractor,
            upload("syllabus.pdf", "Unit 1: Arrays"),
            vec![upload("a.pdf", ""), upload("b.pdf", "\n")],
            QuestionPaperPolicy::Abort,
        )
        .await;
        assert!(matches!(result, Err(IntakeError::EmptyInput(_))));
    }

    #[tokio::test]
    async fn test_abort_policy_fails_on_corrupt_paper() {
        let result = collect_documents(
            &Utf8Extractor,
            upload("syllabus.pdf", "Unit 1: Arrays"),
            vec![upload("good.pdf", "Q1. A"), upload("bad.pdf", "%CORRUPT")],
            QuestionPaperPolicy::Abort,
        )
        .await;
        match result {
            Err(IntakeError::Extraction { file, .. }) => assert_eq!(file, "bad.pdf"),
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_skip_policy_drops_corrupt_paper() {
        let docs = collect_documents(
            &Utf8Extractor,
            upload("syllabus.pdf", "Unit 1: Arrays"),
            vec![upload("bad.pdf", "%CORRUPT"), upload("good.pdf", "Q1. A")],
            QuestionPaperPolicy::Skip,
        )
        .await
        .unwrap();

        let papers: Vec<_> = docs.question_papers.iter().collect();
        assert_eq!(papers, vec![(&1, &"Q1. A".to_string())]);
    }

    #[tokio::test]
    async fn test_skip_policy_still_needs_one_readable_paper() {
        let result = collect_documents(
            &Utf8Extractor,
            upload("syllabus.pdf", "Unit 1: Arrays"),
            vec![upload("bad.pdf", "%CORRUPT")],
            QuestionPaperPolicy::Skip,
        )
        .await;
        assert!(matches!(result, Err(IntakeError::EmptyInput(_))));
    }
}
