//! HTTP completion clients

pub mod endpoint;
pub mod openai;

pub use endpoint::EndpointClient;
pub use openai::OpenAIClient;

use std::time::Duration;

use crate::{
    error::{Error, Result},
    types::{Message, Role},
};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::InvalidConfig(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn check_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "URL must start with http:// or https://: {}",
            url
        )))
    }
}

/// Read the body of a response, mapping non-2xx statuses to `Error::Server`.
///
/// The status wins over a failed body read on an error response.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status = status.as_u16(), "error body unreadable: {}", e);
                String::new()
            }
        };
        return Err(Error::server(status.as_u16(), body));
    }
    Ok(response.text().await?)
}

/// Require an assistant reply
pub(crate) fn expect_assistant(message: Message) -> Result<Message> {
    match message.role() {
        Role::Assistant => Ok(message),
        other => Err(Error::malformed(format!(
            "expected assistant role, got {}",
            other.as_str()
        ))),
    }
}
