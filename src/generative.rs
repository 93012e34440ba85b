//! The generative model seam. Everything that talks to a hosted LLM goes through
//! [`GenerativeModel`], so the composer and the divination controller can run
//! against fakes in tests and degrade cleanly when no provider is configured.

use crate::anthropic::AnthropicClient;
use crate::config::{AppConfig, ProviderKind};
use crate::error::GenerationError;
use crate::openai::OpenAIClient;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError>;

    /// Provider label for logs and the health endpoint
    fn name(&self) -> &str;
}

pub type SharedModel = Arc<dyn GenerativeModel>;

/// Build the configured provider, or `None` when generation is disabled or no key is set.
pub fn build_model(config: &AppConfig) -> Result<Option<SharedModel>, GenerationError> {
    if !config.generative_available() {
        return Ok(None);
    }
    let Some(api_key) = config.api_key.as_deref() else {
        return Ok(None);
    };

    let model: SharedModel = match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAIClient::new(
            api_key,
            config.base_url.as_deref(),
            config.model.as_deref(),
            config.request_timeout,
        )?),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(
            api_key,
            config.base_url.as_deref(),
            config.model.as_deref(),
            config.request_timeout,
        )?),
    };
    Ok(Some(model))
}

/// Trim a completion and reject blank output
pub fn clean_completion(text: &str) -> Result<String, GenerationError> {
    let cleaned = text.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(cleaned.to_string())
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted fakes for the generative seam.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub system_prompt: String,
        pub user_message: String,
        pub temperature: f32,
        pub max_tokens: u32,
    }

    /// Replies from a queue; an exhausted queue behaves like a failing provider.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, ()>>>,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn always_failing() -> Self {
            Self::default()
        }

        pub fn with_replies(replies: &[&str]) -> Self {
            let model = Self::default();
            for reply in replies {
                model.push_reply(reply);
            }
            model
        }

        pub fn push_reply(&self, reply: &str) {
            self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        }

        pub fn push_failure(&self) {
            self.replies.lock().unwrap().push_back(Err(()));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_call(&self) -> Option<RecordedCall> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn complete(
            &self,
            system_prompt: &str,
            user_message: &str,
            temperature: f32,
            max_tokens: u32,
        ) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push(RecordedCall {
                system_prompt: system_prompt.to_string(),
                user_message: user_message.to_string(),
                temperature,
                max_tokens,
            });
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(())) => Err(GenerationError::Api {
                    status: 503,
                    message: "scripted failure".to_string(),
                }),
                None => Err(GenerationError::Disabled),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
