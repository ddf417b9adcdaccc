//! Custom widgets for the TUI

pub mod empty_state;
pub mod input_box;
pub mod markdown;
pub mod spinner;
pub mod transcript_view;

pub use empty_state::EmptyState;
pub use input_box::InputBox;
pub use spinner::Spinner;
pub use transcript_view::TranscriptView;
