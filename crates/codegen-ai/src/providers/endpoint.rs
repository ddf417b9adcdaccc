//! Client for an endpoint that accepts `{messages}` and answers with one message

use std::time::Duration;

use async_trait::async_trait;

use super::{DEFAULT_TIMEOUT, build_http_client, check_url, expect_assistant, read_body};
use crate::{
    client::CompletionClient,
    error::Result,
    types::{CompletionRequest, Message},
};

/// POSTs the full history as JSON and parses a single message back
pub struct EndpointClient {
    client: reqwest::Client,
    url: String,
}

impl EndpointClient {
    /// Create a client for the given endpoint URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        check_url(&url)?;
        Ok(Self {
            client: build_http_client(timeout)?,
            url,
        })
    }
}

#[async_trait]
impl CompletionClient for EndpointClient {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        tracing::debug!(url = %self.url, messages = messages.len(), "POST completion");

        let response = self
            .client
            .post(&self.url)
            .json(&CompletionRequest { messages })
            .send()
            .await?;

        let body = read_body(response).await?;
        let message: Message = serde_json::from_str(&body)?;
        expect_assistant(message)
    }

    fn name(&self) -> &str {
        "endpoint"
    }
}
