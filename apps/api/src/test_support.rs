//! Test doubles shared by unit and handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::analysis::pipeline::Stage;
use crate::config::{Config, LlmSettings};
use crate::intake::documents::{
    ExamDocuments, QuestionPaperPolicy, QuestionPaperSet, SyllabusDocument, Upload,
};
use crate::intake::extract::{ExtractionError, TextExtractor};
use crate::llm_client::{GeneratorFactory, LlmError, TextGenerator};
use crate::state::AppState;

/// Treats upload bytes as UTF-8 text. Bytes starting with `%CORRUPT` fail.
pub struct Utf8Extractor;

#[async_trait]
impl TextExtractor for Utf8Extractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        if bytes.starts_with(b"%CORRUPT") {
            return Err(ExtractionError::Unparseable("invalid file header".to_string()));
        }
        String::from_utf8(bytes.to_vec()).map_err(|e| ExtractionError::Unparseable(e.to_string()))
    }
}

pub fn upload(file_name: &str, text: &str) -> Upload {
    Upload {
        file_name: file_name.to_string(),
        bytes: Bytes::copy_from_slice(text.as_bytes()),
    }
}

pub fn documents() -> ExamDocuments {
    ExamDocuments {
        syllabus: SyllabusDocument {
            text: "Unit 1: Arrays, linked lists\nUnit 2: Trees".to_string(),
        },
        question_papers: QuestionPaperSet::from_iter([
            (0, "Q1. Reverse a linked list.".to_string()),
            (1, "Q1. Explain AVL rotations.".to_string()),
        ]),
    }
}

/// Replies with a fixed string per stage and records every call.
/// Stages are recognised by their system prompt.
pub struct ScriptedGenerator {
    fail_at: Option<(Stage, fn() -> LlmError)>,
    calls: Mutex<Vec<(Stage, String)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails `stage` with a provider 503.
    pub fn failing_at(stage: Stage) -> Self {
        Self::failing_with(stage, || LlmError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }

    pub fn failing_with(stage: Stage, error: fn() -> LlmError) -> Self {
        Self {
            fail_at: Some((stage, error)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(stage: Stage) -> String {
        format!("[mock {} output]", stage.name())
    }

    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn prompt_for(&self, stage: Stage) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let stage = Stage::ALL
            .into_iter()
            .find(|s| s.system_prompt() == system)
            .expect("system prompt does not belong to any stage");
        self.calls.lock().unwrap().push((stage, prompt.to_string()));

        match self.fail_at {
            Some((failing, error)) if failing == stage => Err(error()),
            _ => Ok(Self::reply(stage)),
        }
    }
}

/// Hands the same scripted generator to every request and records the keys
/// it was bound with. Blank keys are rejected like the real client does.
pub struct ScriptedProvider {
    pub generator: Arc<ScriptedGenerator>,
    bound_keys: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            bound_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn bound_keys(&self) -> Vec<String> {
        self.bound_keys.lock().unwrap().clone()
    }
}

impl GeneratorFactory for ScriptedProvider {
    fn bind(&self, api_key: &str) -> Result<Arc<dyn TextGenerator>, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidCredential);
        }
        self.bound_keys.lock().unwrap().push(api_key.to_string());
        let generator: Arc<dyn TextGenerator> = self.generator.clone();
        Ok(generator)
    }
}

/// App state wired to the scripted provider and the UTF-8 extractor.
pub fn test_state(provider: Arc<ScriptedProvider>) -> AppState {
    AppState {
        llm: provider,
        extractor: Arc::new(Utf8Extractor),
        config: Config {
            port: 0,
            rust_log: "debug".to_string(),
            llm: LlmSettings::default(),
            concurrent_parse: false,
            question_paper_policy: QuestionPaperPolicy::Abort,
            max_upload_bytes: 1024 * 1024,
        },
    }
}
