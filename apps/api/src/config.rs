use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::intake::documents::QuestionPaperPolicy;

const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "llama-3.1-70b-versatile";

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
///
/// The provider credential is deliberately absent: it arrives with each
/// request and is bound into that request's generator.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmSettings,
    /// Issue the syllabus and question-paper parse stages concurrently.
    pub concurrent_parse: bool,
    pub question_paper_policy: QuestionPaperPolicy,
    pub max_upload_bytes: usize,
}

/// Provider settings shared by every per-request generator.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LLM_API_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            max_retries: 0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = LlmSettings::default();

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm: LlmSettings {
                api_url: std::env::var("LLM_API_URL").unwrap_or(defaults.api_url),
                model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
                max_tokens: parse_env("LLM_MAX_TOKENS", defaults.max_tokens)?,
                timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120u64)?),
                max_retries: parse_env("LLM_MAX_RETRIES", defaults.max_retries)?,
            },
            concurrent_parse: parse_bool_env("PIPELINE_CONCURRENT_PARSE", false)?,
            question_paper_policy: parse_env("QUESTION_PAPER_POLICY", QuestionPaperPolicy::Abort)?,
            max_upload_bytes: parse_env::<usize>("MAX_UPLOAD_MB", 25)? * 1024 * 1024,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("Environment variable '{key}' must be a boolean, got '{other}'"),
    }
}
