//! Session event types

use codegen_ai::{ErrorKind, Message};
use serde::{Deserialize, Serialize};

/// Events emitted to observers after each state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Idle <-> AwaitingResponse
    PendingChanged { pending: bool },

    /// Messages were appended to the transcript (always a user/assistant pair)
    MessagesAppended { messages: Vec<Message> },

    /// The completion call failed; the transcript is unchanged
    RequestFailed { kind: ErrorKind, message: String },

    /// The completion call was aborted; the transcript is unchanged
    RequestCancelled,
}
