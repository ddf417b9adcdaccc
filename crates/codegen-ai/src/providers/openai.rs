//! OpenAI-compatible Chat Completions client (non-streaming)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_TIMEOUT, build_http_client, check_url, expect_assistant, read_body};
use crate::{
    client::CompletionClient,
    error::{Error, Result},
    types::{Message, Role},
};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: Option<String>,
}

impl OpenAIClient {
    /// Create a new client with an API key and model id
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            system_prompt: None,
        })
    }

    /// Point at a different OpenAI-compatible server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        check_url(&base_url)?;
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Instruction sent ahead of the history on every request.
    /// It never becomes part of the caller's transcript.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if let Some(ref system) = self.system_prompt {
            wire.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        wire.extend(messages.iter().map(|m| ChatMessage {
            role: m.role().as_str(),
            content: m.content(),
        }));
        ChatRequest {
            model: &self.model,
            messages: wire,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, model = %self.model, messages = messages.len(), "POST chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(messages))
            .send()
            .await?;

        let body = read_body(response).await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::malformed("response has no choices"))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| Error::malformed("choice has no content"))?;

        expect_assistant(Message::new(choice.message.role, content))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    role: Role,
    content: Option<String>,
}
