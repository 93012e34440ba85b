use crate::error::GenerationError;
use crate::generative::{clean_completion, GenerativeModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const CLAUDE_HAIKU: &str = "claude-3-5-haiku-20241022";

#[derive(Debug, Serialize, Clone)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: &str,
        endpoint: Option<&str>,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.unwrap_or(ANTHROPIC_API_URL).to_string(),
            model: model.unwrap_or(CLAUDE_HAIKU).to_string(),
        })
    }

    pub async fn chat_completion(
        &self,
        system_prompt: Option<&str>,
        messages: Vec<AnthropicMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            system: system_prompt.map(|s| s.to_string()),
            messages,
            // Anthropic caps temperature at 1.0
            temperature: temperature.clamp(0.0, 1.0),
        };

        let response = self.client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, message: describe_error(&error_text) });
        }

        let completion: MessagesResponse = response.json().await?;
        let text = last_text_block(completion).ok_or(GenerationError::Empty)?;
        clean_completion(&text)
    }
}

/// Prefer the structured `type: message` form when the body parses
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<AnthropicError>(body) {
        Ok(parsed) => format!("{}: {}", parsed.error.error_type, parsed.error.message),
        Err(_) => body.to_string(),
    }
}

fn last_text_block(response: MessagesResponse) -> Option<String> {
    response.content
        .into_iter()
        .filter(|c| c.content_type == "text")
        .last()
        .and_then(|c| c.text)
}

#[async_trait]
impl GenerativeModel for AnthropicClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let messages = vec![AnthropicMessage {
            role: "user".to_string(),
            content: user_message.to_string(),
        }];
        self.chat_completion(Some(system_prompt), messages, temperature, max_tokens).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_structured_error() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(describe_error(body), "overloaded_error: Overloaded");
        assert_eq!(describe_error("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_last_text_block_skips_other_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking"},{"type":"text","text":"first"},{"type":"text","text":"final"}]}"#,
        )
        .unwrap();
        assert_eq!(last_text_block(response).as_deref(), Some("final"));
    }
}
