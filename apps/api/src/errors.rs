use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::pipeline::PipelineError;
use crate::intake::documents::IntakeError;
use crate::intake::extract::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Extraction error in {file}: {source}")]
    Extraction {
        file: String,
        #[source]
        source: ExtractionError,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Credential rejected before any stage ran.
    #[error("Credential error: {0}")]
    Credential(LlmError),
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Extraction { file, source } => AppError::Extraction { file, source },
            IntakeError::EmptyInput(msg) => AppError::EmptyInput(msg),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            // 413 when the upload limit is hit, 400 for malformed bodies
            AppError::Multipart(e) => (e.status(), "VALIDATION_ERROR", e.body_text()),
            AppError::Extraction { file, source } => (
                StatusCode::BAD_REQUEST,
                "EXTRACTION_ERROR",
                format!("{file}: {source}"),
            ),
            AppError::EmptyInput(msg) => (StatusCode::BAD_REQUEST, "EMPTY_INPUT", msg.clone()),
            AppError::Pipeline(e) => {
                let (status, code) = llm_status(&e.source);
                tracing::error!("Pipeline error: {e}");
                (status, code, format!("Error during analysis ({}): {}", e.stage, e.source))
            }
            AppError::Credential(e) => {
                let (status, code) = llm_status(e);
                (status, code, e.to_string())
            }
        }
    }
}

/// Maps a provider failure onto the status the client should see.
fn llm_status(error: &LlmError) -> (StatusCode, &'static str) {
    match error {
        LlmError::InvalidCredential | LlmError::Unauthorized { .. } => {
            (StatusCode::UNAUTHORIZED, "LLM_UNAUTHORIZED")
        }
        LlmError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "LLM_RATE_LIMITED"),
        LlmError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "LLM_TIMEOUT"),
        LlmError::Api { status, .. } if (400..500).contains(status) => {
            (StatusCode::BAD_REQUEST, "LLM_REQUEST_REJECTED")
        }
        LlmError::Api { .. } | LlmError::Http(_) | LlmError::Parse(_) | LlmError::EmptyContent => {
            (StatusCode::BAD_GATEWAY, "LLM_PROVIDER_ERROR")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
