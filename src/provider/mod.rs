// Flowsmith: LLM provider abstraction

pub mod factory;
pub mod http;

use crate::config::{ConfigError, Provider, DEEPSEEK_DOMAIN_MARKER};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("LLM API error: {0}")]
    Remote(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("empty output")]
    EmptyOutput,
}

// ---------------------------------------------------------------------------
// Protocol selection
// ---------------------------------------------------------------------------

/// Request/response shape spoken to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// `POST /chat/completions`, text in `choices[0].message.content`.
    ChatCompletions,
    /// `POST /responses`, text in `output_text` or the output item fragments.
    Responses,
}

impl Protocol {
    /// Choose the protocol for a provider and its configured base URL.
    ///
    /// Only the chat-completions contract is shared by both vendors, so the
    /// responses shape is used for OpenAI alone, and never when the base URL
    /// points at a DeepSeek endpoint.
    pub fn select(provider: Provider, base_url: Option<&str>) -> Self {
        let targets_deepseek = base_url.is_some_and(|u| u.contains(DEEPSEEK_DOMAIN_MARKER));
        if provider == Provider::OpenAi && !targets_deepseek {
            Protocol::Responses
        } else {
            Protocol::ChatCompletions
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "chat" | "chat_completions" => Ok(Protocol::ChatCompletions),
            "responses" => Ok(Protocol::Responses),
            other => Err(ConfigError::UnknownApiShape(other.to_string())),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Protocol::ChatCompletions => "chat/completions",
            Protocol::Responses => "responses",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::ChatCompletions => f.write_str("chat-completions"),
            Protocol::Responses => f.write_str("responses"),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the prompt and return the model's text, trimmed and non-empty.
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError>;

    fn protocol(&self) -> Protocol;

    fn model(&self) -> &str;
}
