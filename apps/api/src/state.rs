use std::sync::Arc;

use crate::config::Config;
use crate::intake::extract::TextExtractor;
use crate::llm_client::GeneratorFactory;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds no credential and no per-request data; everything mutable lives in
/// the handler's own stack frame.
#[derive(Clone)]
pub struct AppState {
    /// Binds each request's credential into its own generator.
    pub llm: Arc<dyn GeneratorFactory>,
    /// Pluggable extractor. Default: PdfTextExtractor.
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Config,
}
