//! Prompt input form: the text field plus its submit rules

use codegen_session::{Prompt, ValidationError};
use codegen_tui::{Theme, input::Action, widgets::InputBox};
use ratatui::{buffer::Buffer, layout::Rect};
use thiserror::Error;

pub const PLACEHOLDER: &str = "Simple toggle button using react hooks.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("a request is already pending")]
    Disabled,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Single required `prompt` field.
///
/// Disabled while a request is pending; a rejected submit keeps the text so
/// the user can fix it.
pub struct PromptForm {
    input: InputBox,
}

impl PromptForm {
    pub fn new() -> Self {
        let mut input = InputBox::new()
            .with_placeholder(PLACEHOLDER)
            .with_title("Prompt");
        input.set_focused(true);
        Self { input }
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.input.set_disabled(pending);
    }

    pub fn is_disabled(&self) -> bool {
        self.input.is_disabled()
    }

    /// Forward an editing action. Ignored while disabled.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        self.input.handle_action(action, width)
    }

    /// Validate and take the prompt, clearing the field on success
    pub fn submit(&mut self) -> Result<Prompt, FormError> {
        if self.is_disabled() {
            return Err(FormError::Disabled);
        }
        let prompt = Prompt::parse(self.input.content())?;
        self.input.clear();
        Ok(prompt)
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        self.input.render(area, buf, theme);
    }
}
