//! # Configuration Module
//!
//! Runtime settings for the bot, read from the environment (a `.env` file is
//! loaded first by `main`).

use anyhow::{Context, Result};
use std::path::PathBuf;

// Defaults for optional settings
pub const DEFAULT_BOT_USERNAME: &str = "example_bot";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_CODE_MODEL: &str = "gemini-1.5-pro-latest";
pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_AUDIT_LOG_PATH: &str = "user.txt";

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown LOG_FORMAT '{other}', expected 'text' or 'json'"),
        }
    }
}

/// Gemini model names, one per request shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Model answering free-text questions
    pub text: String,
    /// Model answering /generate_code requests
    pub code: String,
    /// Vision-capable model answering image prompts
    pub vision: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            code: DEFAULT_CODE_MODEL.to_string(),
            vision: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

/// Generation service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Base URL of the REST API, without trailing slash
    pub base_url: String,
    pub models: ModelConfig,
}

/// Complete bot configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub telegram_token: String,
    /// Bot username shown in canned replies
    pub bot_username: String,
    pub gemini: GeminiConfig,
    /// Append-only file receiving `user -- text` lines
    pub audit_log_path: PathBuf,
    pub log_format: LogFormat,
}

impl BotConfig {
    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .with_context(|| format!("{key} must be set"))
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let api_key = required("GOOGLE_API_KEY")?;

        let base_url = optional("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let log_format = LogFormat::parse(&optional("LOG_FORMAT", "text"))?;

        Ok(Self {
            telegram_token,
            bot_username: optional("BOT_USERNAME", DEFAULT_BOT_USERNAME)
                .trim_start_matches('@')
                .to_string(),
            gemini: GeminiConfig {
                api_key,
                base_url,
                models: ModelConfig {
                    text: optional("GEMINI_TEXT_MODEL", DEFAULT_TEXT_MODEL),
                    code: optional("GEMINI_CODE_MODEL", DEFAULT_CODE_MODEL),
                    vision: optional("GEMINI_VISION_MODEL", DEFAULT_VISION_MODEL),
                },
            },
            audit_log_path: PathBuf::from(optional("AUDIT_LOG_PATH", DEFAULT_AUDIT_LOG_PATH)),
            log_format,
        })
    }
}
