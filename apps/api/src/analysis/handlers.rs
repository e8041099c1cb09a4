//! Axum route handler for the exam analysis API.

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::pipeline::{run_pipeline, PipelineOptions, PipelineResult};
use crate::errors::AppError;
use crate::intake::documents::{collect_documents, Upload};
use crate::state::AppState;

/// The parsed `multipart/form-data` body of an analysis request.
struct AnalyzeForm {
    api_key: String,
    syllabus: Upload,
    question_files: Vec<Upload>,
}

/// POST /analyze/
///
/// Form fields: `api_key`, `syllabus_file`, `question_files` (repeatable).
/// Extracts all uploads, rejects empty inputs, then runs the four-stage
/// pipeline with a generator bound to the caller's key. Returns both
/// `exam_analysis` and `practice_questions`, or an error and nothing else.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);

    async move {
        let form = read_form(&mut multipart).await?;
        info!(
            "Received syllabus '{}' and {} question files",
            form.syllabus.file_name,
            form.question_files.len()
        );

        let generator = state.llm.bind(&form.api_key).map_err(AppError::Credential)?;

        let documents = collect_documents(
            state.extractor.as_ref(),
            form.syllabus,
            form.question_files,
            state.config.question_paper_policy,
        )
        .await?;
        info!(
            "Extracted syllabus ({} chars) and {} question papers",
            documents.syllabus.text.len(),
            documents.question_papers.len()
        );
        for (index, text) in documents.question_papers.iter() {
            debug!("Question paper #{index}: {} chars", text.len());
        }

        let options = PipelineOptions {
            concurrent_parse: state.config.concurrent_parse,
        };
        let result = run_pipeline(generator.as_ref(), &documents, options).await?;

        info!("Analysis complete");
        Ok::<_, AppError>(Json(result))
    }
    .instrument(span)
    .await
}

async fn read_form(multipart: &mut Multipart) -> Result<AnalyzeForm, AppError> {
    let mut api_key = None;
    let mut syllabus = None;
    let mut question_files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "api_key" => api_key = Some(field.text().await?),
            "syllabus_file" => syllabus = Some(read_upload(field).await?),
            "question_files" => question_files.push(read_upload(field).await?),
            other => debug!("Ignoring unexpected form field '{other}'"),
        }
    }

    let api_key =
        api_key.ok_or_else(|| AppError::Validation("api_key is required".to_string()))?;
    let syllabus = syllabus
        .ok_or_else(|| AppError::Validation("syllabus_file is required".to_string()))?;
    if question_files.is_empty() {
        return Err(AppError::Validation(
            "at least one question_files upload is required".to_string(),
        ));
    }

    Ok(AnalyzeForm {
        api_key,
        syllabus,
        question_files,
    })
}

async fn read_upload(field: Field<'_>) -> Result<Upload, AppError> {
    let file_name = field
        .file_name()
        .or(field.name())
        .unwrap_or("upload")
        .to_string();
    let bytes = field.bytes().await?;
    Ok(Upload { file_name, bytes })
}
