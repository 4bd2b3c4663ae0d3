//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::types::ChatRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<ChatRole> for PromptRole {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::User => PromptRole::User,
            ChatRole::Assistant => PromptRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Produces one completion for a prompt. `Ok(None)` means the model
/// answered without any text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<Option<String>>;
}

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.clone() else {
            return Err(Error::Config("VIBECODER_AI_API_KEY is not set".to_string()));
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Pulls the first choice's text out of a `/chat/completions` body.
fn parse_completion(body: &str) -> Result<Option<String>> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| Error::Upstream(format!("unreadable completion: {e}")))?;

    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content))
}

#[async_trait]
impl ChatBackend for OpenAiCompatClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<Option<String>> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Upstream(format!("status {}: {text}", status.as_u16())));
        }

        parse_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_completion() {
        let body = serde_json::json!({
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Goed bezig!" },
                "finish_reason": "stop"
            }]
        })
        .to_string();
        assert_eq!(parse_completion(&body).unwrap().as_deref(), Some("Goed bezig!"));
    }

    #[test]
    fn test_parse_empty_choices() {
        let body = serde_json::json!({ "choices": [] }).to_string();
        assert_eq!(parse_completion(&body).unwrap(), None);

        let body = serde_json::json!({ "choices": [{ "message": { "content": null } }] }).to_string();
        assert_eq!(parse_completion(&body).unwrap(), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_completion("<html>"), Err(Error::Upstream(_))));
    }

    #[test]
    fn test_request_wire_format() {
        let messages = [PromptMessage::new(PromptRole::System, "be nice")];
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 2048,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 2048);
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OpenAiCompatClient::new(&AiConfig::default()),
            Err(Error::Config(_))
        ));
    }
}
