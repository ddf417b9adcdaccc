//! Placeholder shown when there is nothing in the transcript

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    widgets::{Paragraph, Widget},
};

pub const EMPTY_MESSAGE: &str = "Nothing to show!";

/// Centered placeholder text
pub struct EmptyState<'a> {
    theme: &'a Theme,
}

impl<'a> EmptyState<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }
}

impl Widget for EmptyState<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let row = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
        Paragraph::new(EMPTY_MESSAGE)
            .style(self.theme.dim_style())
            .alignment(Alignment::Center)
            .render(row, buf);
    }
}
