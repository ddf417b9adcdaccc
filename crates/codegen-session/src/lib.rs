//! codegen-session: Conversation state machine
//!
//! This crate owns the transcript of a code generation session and the
//! coordinator that serializes requests to a completion client, mapping
//! each outcome onto transcript updates and observer events.

pub mod coordinator;
pub mod events;
pub mod handle;
pub mod prompt;
pub mod transcript;

pub use coordinator::{RefreshHook, RequestCoordinator, SubmitOutcome};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use prompt::{Prompt, ValidationError};
pub use transcript::{ConversationState, TranscriptStore};
