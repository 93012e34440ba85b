use crate::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::error::GenerationError;
use crate::generative::{clean_completion, GenerativeModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible chat completions API (DeepSeek by default)
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(
        api_key: &str,
        base_url: Option<&str>,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: completions_endpoint(base_url.unwrap_or(DEFAULT_BASE_URL)),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        let content = completion.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerationError::Empty)?;
        clean_completion(&content)
    }
}

/// Accept either a bare host (`https://api.deepseek.com`) or a full `/chat/completions` URL
fn completions_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[async_trait]
impl GenerativeModel for OpenAIClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let messages = vec![
            ChatMessage { role: "system".to_string(), content: system_prompt.to_string() },
            ChatMessage { role: "user".to_string(), content: user_message.to_string() },
        ];
        self.chat_completion(messages, temperature, max_tokens).await
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
