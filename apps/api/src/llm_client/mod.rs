/// LLM Client — the single point of entry for all text-generation calls in Xamify.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// All LLM interactions MUST go through this module.
///
/// The provider speaks the OpenAI chat-completions protocol (Groq by default).
/// No credential is held at process level: every request binds the caller's
/// key into its own `BoundGenerator`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderValue, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmSettings;

pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("credential is missing or malformed")]
    InvalidCredential,

    #[error("provider rejected the credential (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("rate limited by provider: {message}")]
    RateLimited { message: String },

    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Produces text for one prompt. Bound to a single credential.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Builds a credential-bound generator for one request.
///
/// Carried in `AppState` as `Arc<dyn GeneratorFactory>` so tests can swap in
/// a scripted provider.
pub trait GeneratorFactory: Send + Sync {
    fn bind(&self, api_key: &str) -> Result<Arc<dyn TextGenerator>, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text of the first choice, ignoring blank replies.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Shared provider client. Holds the connection pool and settings, never a key.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: Arc<LlmSettings>,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

impl GeneratorFactory for LlmClient {
    fn bind(&self, api_key: &str) -> Result<Arc<dyn TextGenerator>, LlmError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::InvalidCredential);
        }
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| LlmError::InvalidCredential)?;
        auth.set_sensitive(true);

        let generator: Arc<dyn TextGenerator> = Arc::new(BoundGenerator {
            client: self.client.clone(),
            settings: Arc::clone(&self.settings),
            auth,
        });
        Ok(generator)
    }
}

/// A generator carrying one request's credential.
pub struct BoundGenerator {
    client: Client,
    settings: Arc<LlmSettings>,
    auth: HeaderValue,
}

impl BoundGenerator {
    /// Makes one raw call, returning the full response object.
    async fn call_once(&self, body: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .header(reqwest::header::AUTHORIZATION, self.auth.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, provider_message(body)));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify_transport(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn classify_transport(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.settings.timeout)
        } else {
            LlmError::Http(e)
        }
    }
}

#[async_trait]
impl TextGenerator for BoundGenerator {
    /// Retries on 429, 5xx and transport errors with exponential backoff when
    /// `max_retries` is non-zero.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut attempt = 0;
        loop {
            match self.call_once(&body).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                            usage.prompt_tokens, usage.completion_tokens
                        );
                    }
                    return response
                        .text()
                        .map(str::to_string)
                        .ok_or(LlmError::EmptyContent);
                }
                Err(e) if is_retryable(&e) && attempt < self.settings.max_retries => {
                    attempt += 1;
                    // Exponential backoff: 1s, 2s, 4s
                    let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(6)));
                    warn!(
                        "LLM call attempt {} failed ({e}), retrying after {}ms...",
                        attempt,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::RateLimited { .. } | LlmError::Http(_) => true,
        LlmError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

fn classify_status(status: StatusCode, message: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { message },
        _ => LlmError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Unwraps `{"error": {"message": ...}}` bodies, falling back to the raw body.
fn provider_message(body: String) -> String {
    serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}
