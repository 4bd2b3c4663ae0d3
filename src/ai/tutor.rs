//! The programming tutor: prompt assembly and fallbacks around a
//! [`ChatBackend`].

use std::sync::Arc;

use tracing::{error, warn};

use super::client::{ChatBackend, OpenAiCompatClient, PromptMessage, PromptRole};
use crate::config::AiConfig;
use crate::editor::CHAT_HISTORY_LIMIT;
use crate::types::{ChatMessage, CodeState};

pub const EMPTY_ANSWER_FALLBACK: &str = "Sorry, I could not generate an answer. Please try again.";
pub const CONNECTION_FALLBACK: &str =
    "Something went wrong while contacting the AI. Please try again.";

pub const SYSTEM_PROMPT: &str = r#"You are a friendly programming tutor for beginners who are learning HTML, CSS and JavaScript. Answer in the language the student writes in, using informal, simple words and no jargon.

How you help:

1. Give code in SMALL pieces. One small step per answer, never the whole page at once.
2. Always say WHERE the code goes: "Put this in the **HTML** tab", "Put this in the **CSS** tab", "Add this to the **JavaScript** tab".
3. Explain briefly HOW it works: what the code does and what effect it has.
4. Encourage the student ("Nice work!", "You're on the right track!", "That's a common mistake, no problem!").
5. End with a suggestion for the next step they can try.

Rules:
- Put code in fenced markdown blocks tagged with the right language: ```html, ```css or ```javascript.
- When something is broken, explain kindly what is wrong and how to fix it, step by step.

Example answer:

Let's give the button a nice colour!

Put this in the **CSS** tab:

```css
button {
  background-color: #ff6b6b;
  color: white;
}
```

`background-color` makes the button red and `color: white` makes the text white. Try it! Next we can round the corners."#;

/// The student's current buffers, sent as a second system message.
#[must_use]
pub fn context_block(code: &CodeState) -> String {
    format!(
        "\n--- CURRENT CODE ---\nHTML:\n{}\n\nCSS:\n{}\n\nJavaScript:\n{}\n--- END OF CODE ---\n",
        code.markup, code.style, code.script
    )
}

/// System prompt, code context, the last [`CHAT_HISTORY_LIMIT`] history
/// turns, then the question.
#[must_use]
pub fn build_prompt(message: &str, code: &CodeState, history: &[ChatMessage]) -> Vec<PromptMessage> {
    let start = history.len().saturating_sub(CHAT_HISTORY_LIMIT);

    let mut prompt = Vec::with_capacity(CHAT_HISTORY_LIMIT + 3);
    prompt.push(PromptMessage::new(PromptRole::System, SYSTEM_PROMPT));
    prompt.push(PromptMessage::new(PromptRole::System, context_block(code)));
    prompt.extend(
        history[start..]
            .iter()
            .map(|m| PromptMessage::new(m.role.into(), m.content.clone())),
    );
    prompt.push(PromptMessage::new(PromptRole::User, message));
    prompt
}

#[derive(Clone)]
pub struct TutorService {
    backend: Option<Arc<dyn ChatBackend>>,
}

impl TutorService {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A tutor without a backend. Every question gets
    /// [`CONNECTION_FALLBACK`].
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { backend: None }
    }

    /// Builds the tutor from config; a missing API key leaves it unconfigured.
    #[must_use]
    pub fn from_config(config: &AiConfig) -> Self {
        match OpenAiCompatClient::new(config) {
            Ok(client) => Self::new(Arc::new(client)),
            Err(e) => {
                warn!("AI tutor disabled: {e}");
                Self::unconfigured()
            }
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Answers a question. Never fails: an empty completion or an upstream
    /// fault turns into a fallback text.
    pub async fn generate(&self, message: &str, code: &CodeState, history: &[ChatMessage]) -> String {
        let Some(backend) = &self.backend else {
            error!("AI chat requested but no API key is configured");
            return CONNECTION_FALLBACK.to_string();
        };

        let prompt = build_prompt(message, code, history);
        match backend.complete(&prompt).await {
            Ok(Some(answer)) if !answer.trim().is_empty() => answer,
            Ok(_) => EMPTY_ANSWER_FALLBACK.to_string(),
            Err(e) => {
                error!("AI chat request failed: {e}");
                CONNECTION_FALLBACK.to_string()
            }
        }
    }
}

/// Question for a "check my code" request, optionally quoting an error
/// from the preview console.
#[must_use]
pub fn debug_question(error_message: Option<&str>) -> String {
    match error_message {
        Some(msg) => {
            format!("I get this error message: \"{msg}\". Can you help me find and fix the problem?")
        }
        None => "Can you check my code and see if there are any mistakes?".to_string(),
    }
}

#[must_use]
pub fn explain_question(part: Option<&str>) -> String {
    match part {
        Some(part) => format!("Can you explain what this piece of code does: {part}"),
        None => "Can you explain what my current code does?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{Error, Result};
    use crate::types::ChatRole;

    struct Scripted {
        answer: Result<Option<String>>,
        seen: Mutex<Vec<PromptMessage>>,
    }

    impl Scripted {
        fn answering(answer: Result<Option<String>>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn complete(&self, messages: &[PromptMessage]) -> Result<Option<String>> {
            *self.seen.lock().unwrap() = messages.to_vec();
            match &self.answer {
                Ok(answer) => Ok(answer.clone()),
                Err(e) => Err(Error::Upstream(e.to_string())),
            }
        }
    }

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
                ChatMessage::new(role, format!("bericht {i}"))
            })
            .collect()
    }

    #[test]
    fn test_prompt_layout() {
        let code = CodeState::new("<p>x</p>", "p {}", "let a;");
        let prompt = build_prompt("Hoe maak ik een knop?", &code, &history(14));

        assert_eq!(prompt.len(), 2 + CHAT_HISTORY_LIMIT + 1);
        assert_eq!(prompt[0].content, SYSTEM_PROMPT);
        assert_eq!(prompt[1].role, PromptRole::System);
        assert!(prompt[1].content.contains("HTML:\n<p>x</p>"));
        assert!(prompt[1].content.contains("CSS:\np {}"));
        assert_eq!(prompt[2].content, "bericht 4");
        assert_eq!(prompt[2].role, PromptRole::User);
        assert_eq!(prompt[3].role, PromptRole::Assistant);
        assert_eq!(prompt.last().unwrap().content, "Hoe maak ik een knop?");
    }

    #[tokio::test]
    async fn test_answer_is_passed_through() {
        let backend = Scripted::answering(Ok(Some("```css\np {}\n```".to_string())));
        let tutor = TutorService::new(backend.clone());

        let answer = tutor.generate("help", &CodeState::default(), &[]).await;
        assert_eq!(answer, "```css\np {}\n```");
        assert_eq!(backend.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_answer_fallback() {
        let tutor = TutorService::new(Scripted::answering(Ok(Some(String::new()))));
        assert_eq!(
            tutor.generate("help", &CodeState::default(), &[]).await,
            EMPTY_ANSWER_FALLBACK
        );

        let tutor = TutorService::new(Scripted::answering(Ok(None)));
        assert_eq!(
            tutor.generate("help", &CodeState::default(), &[]).await,
            EMPTY_ANSWER_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_fallback() {
        let tutor = TutorService::new(Scripted::answering(Err(Error::Upstream("timeout".into()))));
        assert_eq!(
            tutor.generate("help", &CodeState::default(), &[]).await,
            CONNECTION_FALLBACK
        );

        let tutor = TutorService::unconfigured();
        assert!(!tutor.is_configured());
        assert_eq!(
            tutor.generate("help", &CodeState::default(), &[]).await,
            CONNECTION_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_debug_question_quotes_error() {
        let backend = Scripted::answering(Ok(Some("ok".to_string())));
        let tutor = TutorService::new(backend.clone());

        tutor
            .generate(&debug_question(Some("button is null")), &CodeState::default(), &[])
            .await;
        let seen = backend.seen.lock().unwrap();
        assert!(seen.last().unwrap().content.contains("\"button is null\""));
        assert!(explain_question(None).contains("my current code"));
    }
}
