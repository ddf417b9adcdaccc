//! codegen-tui: Terminal UI components
//!
//! Widgets for rendering a prompt/response transcript with ratatui.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
