//! Transcript widget: messages rendered newest-first

use codegen_ai::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;

/// Widget for displaying a transcript.
///
/// Takes messages already in display order (newest first), so scroll offset 0
/// always shows the latest reply. User prompts are plain text; assistant
/// replies are rendered as markdown. Both are wrapped to the view width, so
/// one line is one screen row.
pub struct TranscriptView<'a> {
    messages: &'a [Message],
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> TranscriptView<'a> {
    pub fn new(messages: &'a [Message], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
        }
    }

    /// Skip this many lines from the top
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// All lines for the given width
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        self.messages
            .iter()
            .flat_map(|msg| render_message(msg, self.theme, width))
            .collect()
    }

    /// Number of screen rows at this width, for clamping scroll
    pub fn line_count(&self, width: usize) -> usize {
        self.lines(width).len()
    }
}

fn render_message(msg: &Message, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = width.saturating_sub(2).max(1);

    match msg.role() {
        Role::User => {
            lines.push(Line::from(Span::styled("▶ You", theme.accent_bold())));
            for line in textwrap::wrap(msg.content(), content_width) {
                lines.push(Line::from(Span::styled(
                    format!("  {}", line),
                    theme.base_style(),
                )));
            }
        }
        Role::Assistant => {
            lines.push(Line::from(Span::styled("◀ Assistant", theme.reply_bold())));
            for line in render_markdown(msg.content(), theme, content_width) {
                let mut spans = vec![Span::raw("  ")];
                spans.extend(line.spans);
                lines.push(Line::from(spans));
            }
        }
    }

    lines.push(Line::from(""));
    lines
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible: Vec<Line> = self
            .lines(area.width as usize)
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible).render(area, buf);
    }
}
