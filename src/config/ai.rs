//! Tutor backend settings parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_AI_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_AI_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_AI_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    /// `None` leaves the tutor unconfigured; chat then answers with the
    /// fallback message.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            model: DEFAULT_AI_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            request_timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_AI_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl AiConfig {
    /// Reads the tutor configuration.
    ///
    /// - `VIBECODER_AI_API_KEY`: bearer key for the OpenAI-compatible endpoint
    /// - `VIBECODER_AI_BASE_URL`: defaults to Groq's OpenAI-compatible API
    /// - `VIBECODER_AI_MODEL`: defaults to `llama-3.3-70b-versatile`
    /// - `VIBECODER_AI_TIMEOUT_SECS`: request timeout, default 60
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let api_key = lookup("VIBECODER_AI_API_KEY").filter(|k| !k.trim().is_empty());
        let base_url = lookup("VIBECODER_AI_BASE_URL")
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_string();
        let model = lookup("VIBECODER_AI_MODEL").unwrap_or(defaults.model);
        let request_timeout = lookup("VIBECODER_AI_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(defaults.request_timeout, Duration::from_secs);

        Self {
            api_key,
            base_url,
            model,
            request_timeout,
            ..defaults
        }
    }
}
