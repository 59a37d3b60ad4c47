use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::state::Settings;

/// Opening marker of a ChatML turn, followed by the role name.
pub const TURN_START: &str = "<|im_start|>";
/// Closing marker of a ChatML turn.
pub const TURN_END: &str = "<|im_end|>";
/// Marker that hands the floor to the model. Everything generated after the
/// last occurrence of it is the answer.
pub const ASSISTANT_OPENING: &str = "<|im_start|> assistant\n";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("generated text does not contain the assistant turn marker")]
    MissingAssistantMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// `<|im_start|>{role}\n{content}<|im_end|>\n`
    pub fn render(&self) -> String {
        format!("{}{}\n{}{}\n", TURN_START, self.role, self.content, TURN_END)
    }
}

/// Render the turns in order and open the assistant turn.
pub fn render_prompt(turns: &[Message]) -> String {
    let mut prompt: String = turns.iter().map(Message::render).collect();
    prompt.push_str(ASSISTANT_OPENING);
    prompt.push(' ');
    prompt
}

/// Return everything after the last assistant marker in `generated`.
pub fn extract_answer(generated: &str) -> Result<String, GenerationError> {
    generated
        .rfind(ASSISTANT_OPENING)
        .map(|idx| generated[idx + ASSISTANT_OPENING.len()..].to_string())
        .ok_or(GenerationError::MissingAssistantMarker)
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Fully rendered ChatML prompt.
    pub prompt: String,
    pub max_new_tokens: u32,
    /// Use the end-of-sequence token as the padding token.
    pub pad_with_eos: bool,
}

impl GenerationRequest {
    pub fn new(prompt: String, max_new_tokens: u32) -> Self {
        Self {
            prompt,
            max_new_tokens,
            pad_with_eos: false,
        }
    }

    pub fn pad_with_eos(mut self) -> Self {
        self.pad_with_eos = true;
        self
    }
}

/// A text-generation capability. Implementations return the decoded full
/// sequence, i.e. the prompt followed by the continuation, special markers
/// included.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Client for an OpenAI-compatible completions server hosting one model.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// Bind a client to `model`. Called once per protocol run.
    pub fn load(settings: &Settings, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.llm_base_url.clone(),
            model: model.to_string(),
            api_key: settings.llm_api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/completions", base)
        } else {
            format!("{}/v1/completions", base)
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        // Completion servers pick the pad token themselves; `pad_with_eos`
        // has no wire equivalent.
        let body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "max_tokens": request.max_new_tokens,
            "temperature": 0.0,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let json: serde_json::Value = resp.json().await?;
        let completion = json["choices"]
            .get(0)
            .and_then(|c| c["text"].as_str())
            .ok_or_else(|| {
                GenerationError::MalformedResponse("missing choices[0].text".to_string())
            })?;

        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            completion_len = completion.len(),
            "completion received"
        );

        Ok(format!("{}{}", request.prompt, completion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_turn() {
        let msg = Message::system("be brief");
        assert_eq!(msg.render(), "<|im_start|>system\nbe brief<|im_end|>\n");
    }

    #[test]
    fn test_render_prompt_opens_assistant_turn() {
        let prompt = render_prompt(&[Message::system("S"), Message::user("U")]);
        assert_eq!(
            prompt,
            "<|im_start|>system\nS<|im_end|>\n<|im_start|>user\nU<|im_end|>\n<|im_start|> assistant\n "
        );
    }

    #[test]
    fn test_extract_answer_after_marker() {
        let raw = "<|im_start|>user\nhi<|im_end|>\n<|im_start|> assistant\n The result is X";
        assert_eq!(extract_answer(raw).unwrap(), " The result is X");
    }

    #[test]
    fn test_extract_answer_uses_last_marker() {
        let raw = "<|im_start|> assistant\n first<|im_start|> assistant\n second";
        assert_eq!(extract_answer(raw).unwrap(), " second");
    }

    #[test]
    fn test_extract_answer_missing_marker() {
        let err = extract_answer("no markers at all").unwrap_err();
        assert!(matches!(err, GenerationError::MissingAssistantMarker));
    }

    #[test]
    fn test_endpoint_resolution() {
        let mut settings = Settings::default();
        settings.llm_base_url = "http://localhost:8000/v1/".to_string();
        let client = LlmClient::load(&settings, "m").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/completions");

        settings.llm_base_url = "http://localhost:8000".to_string();
        let client = LlmClient::load(&settings, "m").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/completions");
        assert_eq!(client.model(), "m");
    }
}
