//! The completion collaborator seam

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::Result, types::Message};

/// Something that, given a message history, returns the next assistant message
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the full history (oldest first) and wait for the reply.
    ///
    /// Implementations must only return `Ok` with an assistant message.
    async fn complete(&self, messages: &[Message]) -> Result<Message>;

    /// Short label for logs and the status bar
    fn name(&self) -> &str;
}

/// Shared client handle
pub type BoxedClient = Arc<dyn CompletionClient>;
