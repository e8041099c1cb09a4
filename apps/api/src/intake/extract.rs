//! PDF text extraction.
//!
//! `PdfTextExtractor` wraps `pdf-extract`, which concatenates every page's
//! text in document order. Parsing is CPU-bound and the parser can panic on
//! hostile input, so it runs on the blocking pool and a panic is reported as
//! an ordinary `ExtractionError`.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Error reading PDF: {0}")]
    Unparseable(String),

    #[error("PDF parser crashed: {0}")]
    ParserPanic(String),
}

/// Turns one uploaded document into plain text.
///
/// An empty result is not an error here; callers decide what emptiness means.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError>;
}

pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        let size = bytes.len();
        let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractionError::Unparseable(e.to_string()))
        })
        .await
        .map_err(|e| ExtractionError::ParserPanic(e.to_string()))??;

        debug!("Extracted {} chars from {} byte PDF", text.len(), size);
        Ok(text)
    }
}
