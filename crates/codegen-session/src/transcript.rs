//! Transcript storage and conversation snapshots

use std::sync::Arc;

use codegen_ai::Message;
use parking_lot::Mutex;

/// Append-only, chronologically ordered message log.
///
/// Cloning is cheap and clones share the same log, so a view can hold one
/// while the coordinator appends to another.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of messages under a single lock acquisition.
    pub fn append(&self, messages: impl IntoIterator<Item = Message>) {
        self.messages.lock().extend(messages);
    }

    /// All messages, oldest first
    pub fn all(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Snapshot of the log paired with the caller's pending flag
    pub fn snapshot(&self, pending: bool) -> ConversationState {
        ConversationState {
            messages: self.all(),
            pending,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// Oldest first
    pub messages: Vec<Message>,
    pub pending: bool,
}

impl ConversationState {
    /// Whether the "nothing to show" placeholder should be rendered
    pub fn shows_placeholder(&self) -> bool {
        self.messages.is_empty() && !self.pending
    }

    /// Messages in display order
    pub fn newest_first(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev()
    }
}
