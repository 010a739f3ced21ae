// Flowsmith: HTTP-based LLM provider (chat completions and responses)

use super::*;
use crate::config::{ApiKey, GenerationConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Characters of an error body kept in diagnostics.
const ERROR_BODY_CHARS: usize = 200;

/// HTTPProvider speaks one of two OpenAI-style wire shapes, fixed at
/// construction. There is no retry and no overall request timeout; a failed
/// call is returned to the caller as-is.
pub struct HTTPProvider {
    api_key: ApiKey,
    api_base: String,
    client: Client,
    model: String,
    protocol: Protocol,
    temperature: f64,
    max_output_tokens: u32,
    json_mode: bool,
}

impl HTTPProvider {
    pub fn new(cfg: &GenerationConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key: cfg.api_key.clone(),
            api_base: cfg.endpoint_base(),
            client,
            model: cfg.model.clone(),
            protocol: cfg.protocol(),
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
            json_mode: cfg.json_mode,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            self.protocol.path()
        )
    }

    fn request_body(&self, messages: &[Message]) -> Value {
        match self.protocol {
            Protocol::ChatCompletions => {
                let mut body = json!({
                    "model": self.model,
                    "messages": messages,
                    "temperature": self.temperature,
                    "max_tokens": self.max_output_tokens,
                });
                if self.json_mode {
                    body["response_format"] = json!({ "type": "json_object" });
                }
                body
            }
            Protocol::Responses => {
                let mut body = json!({
                    "model": self.model,
                    "input": messages,
                    "temperature": self.temperature,
                    "max_output_tokens": self.max_output_tokens,
                });
                if self.json_mode {
                    body["text"] = json!({ "format": { "type": "json_object" } });
                }
                body
            }
        }
    }
}

#[async_trait]
impl LLMProvider for HTTPProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let url = self.endpoint();
        let body = self.request_body(messages);

        tracing::debug!(
            url = %url,
            model = %self.model,
            protocol = %self.protocol,
            messages = messages.len(),
            "Sending LLM request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = %status, "LLM API returned an error status");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: excerpt(&response_body),
            });
        }

        tracing::debug!(status = %status, body_len = response_body.len(), "LLM response received");

        let text = match self.protocol {
            Protocol::ChatCompletions => parse_chat_response(&response_body)?,
            Protocol::Responses => parse_responses_response(&response_body)?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyOutput);
        }
        Ok(text.to_string())
    }

    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Fail on an `error` object embedded in a successful HTTP response.
fn check_api_error(v: &Value) -> Result<(), ProviderError> {
    if let Some(err) = v.get("error").filter(|e| !e.is_null()) {
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(ProviderError::Remote(excerpt(msg)));
    }
    Ok(())
}

/// Collapse whitespace runs (newlines included) to single spaces and cap the
/// length, so error bodies stay on one diagnostic line.
fn excerpt(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= ERROR_BODY_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(ERROR_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}

fn parse_json(body: &str) -> Result<Value, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

/// Text of the first choice of a chat completion. A null content is empty.
fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let v = parse_json(body)?;
    check_api_error(&v)?;

    let choice = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".into()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| ProviderError::MalformedResponse("no message in choice".into()))?;

    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string())
}

/// Aggregated `output_text` when present, else every content text fragment
/// from the output items, concatenated in order.
fn parse_responses_response(body: &str) -> Result<String, ProviderError> {
    let v = parse_json(body)?;
    check_api_error(&v)?;

    if let Some(text) = v
        .get("output_text")
        .and_then(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
    {
        return Ok(text.to_string());
    }

    let mut text = String::new();
    let items = v.get("output").and_then(|o| o.as_array());
    for item in items.into_iter().flatten() {
        let parts = item.get("content").and_then(|c| c.as_array());
        for part in parts.into_iter().flatten() {
            if let Some(fragment) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(fragment);
            }
        }
    }
    Ok(text)
}
