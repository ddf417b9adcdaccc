//! Text input widget

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Single-line text input widget.
///
/// While disabled the box ignores every edit and renders dimmed without a
/// cursor. The content is kept, so re-enabling resumes where the user left off.
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position (character index, not byte index)
    cursor: usize,
    /// Horizontal scroll offset (in display width)
    scroll: usize,
    placeholder: String,
    title: String,
    focused: bool,
    disabled: bool,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the label shown in the top border
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Display width of text before the cursor
    fn cursor_display_width(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    /// Handle an input action. Returns whether anything changed.
    ///
    /// `width` is the outer width of the box, used to keep the cursor visible.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        if self.disabled {
            return false;
        }

        let char_count = self.content.chars().count();
        let changed = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.remove_at_cursor();
                true
            }
            Action::Delete if self.cursor < char_count => {
                self.remove_at_cursor();
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < char_count => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = char_count;
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                let range = self.byte_offset(start)..self.byte_offset(self.cursor);
                self.content.drain(range);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    // single line: newlines collapse into one space
                    if c == '\n' || c == '\r' {
                        if self.cursor > 0 && !self.content.ends_with(' ') {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        };

        if changed {
            self.update_scroll(width as usize);
        }
        changed
    }

    fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor);
        self.content.insert(offset, c);
        self.cursor += 1;
    }

    fn remove_at_cursor(&mut self) {
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        self.content.drain(start..end);
    }

    fn update_scroll(&mut self, width: usize) {
        // borders plus one cell for the cursor
        let visible_width = width.saturating_sub(3).max(1);
        let cursor_pos = self.cursor_display_width();

        if cursor_pos < self.scroll {
            self.scroll = cursor_pos;
        } else if cursor_pos >= self.scroll + visible_width {
            self.scroll = cursor_pos + 1 - visible_width;
        }
    }

    fn visible_text(&self, width: usize) -> String {
        let mut skipped = 0;
        let mut used = 0;
        let mut visible = String::new();
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if skipped < self.scroll {
                skipped += w;
                continue;
            }
            if used + w > width {
                break;
            }
            visible.push(c);
            used += w;
        }
        visible
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let border_style = if self.disabled {
            theme.dim_style()
        } else if self.focused {
            theme.accent_style()
        } else {
            theme.border_style()
        };
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style);
        if !self.title.is_empty() {
            block = block.title(Span::styled(format!(" {} ", self.title), border_style));
        }

        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else if self.disabled {
            (self.visible_text(inner.width as usize), theme.dim_style())
        } else {
            (self.visible_text(inner.width as usize), theme.base_style())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if self.focused && !self.disabled && inner.width > 0 {
            let cursor_x = self.cursor_display_width().saturating_sub(self.scroll);
            if cursor_x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + cursor_x as u16, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::test_utils::buffer_to_string;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        for c in text.chars() {
            input.handle_action(&Action::Char(c), 40);
        }
        input
    }

    #[test]
    fn test_typing_and_editing() {
        let mut input = typed("helo");
        input.handle_action(&Action::Left, 40);
        input.handle_action(&Action::Char('l'), 40);
        assert_eq!(input.content(), "hello");

        input.handle_action(&Action::Home, 40);
        input.handle_action(&Action::Delete, 40);
        assert_eq!(input.content(), "ello");

        input.handle_action(&Action::End, 40);
        input.handle_action(&Action::Backspace, 40);
        assert_eq!(input.content(), "ell");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = typed("añb");
        input.handle_action(&Action::Left, 40);
        input.handle_action(&Action::Backspace, 40);
        assert_eq!(input.content(), "ab");
    }

    #[test]
    fn test_delete_word() {
        let mut input = typed("write a parser  ");
        input.handle_action(&Action::DeleteWord, 40);
        assert_eq!(input.content(), "write a ");
    }

    #[test]
    fn test_paste_collapses_newlines() {
        let mut input = InputBox::new();
        input.handle_action(&Action::Paste("fn main\r\n{}".into()), 40);
        assert_eq!(input.content(), "fn main {}");
    }

    #[test]
    fn test_disabled_ignores_edits() {
        let mut input = typed("hello");
        input.set_disabled(true);

        assert!(!input.handle_action(&Action::Char('!'), 40));
        assert!(!input.handle_action(&Action::Backspace, 40));
        assert!(!input.handle_action(&Action::ClearLine, 40));
        assert_eq!(input.content(), "hello");

        input.set_disabled(false);
        assert!(input.handle_action(&Action::Char('!'), 40));
        assert_eq!(input.content(), "hello!");
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut input = typed("hello");
        input.clear();
        assert_eq!(input.content(), "");
        assert!(input.handle_action(&Action::Char('x'), 40));
        assert_eq!(input.content(), "x");
    }

    #[test]
    fn test_render_placeholder_and_content() {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 20, 3);

        let input = InputBox::new().with_placeholder("Ask for code");
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf, &theme);
        assert!(buffer_to_string(&buf).contains("Ask for code"));

        let input = typed("hello");
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf, &theme);
        assert!(buffer_to_string(&buf).contains("hello"));
    }

    #[test]
    fn test_render_scrolls_long_content() {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 10, 3);
        let mut input = InputBox::new();
        for c in "abcdefghijklmnop".chars() {
            input.handle_action(&Action::Char(c), area.width);
        }

        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf, &theme);
        let text = buffer_to_string(&buf);
        assert!(text.contains("klmnop"));
        assert!(!text.contains("abc"));
    }

    #[test]
    fn test_render_disabled_is_dim() {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 20, 3);
        let mut input = typed("hello");
        input.set_focused(true);
        input.set_disabled(true);

        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf, &theme);
        let cell = buf.cell((1, 1)).unwrap();
        assert_eq!(cell.symbol(), "h");
        assert_eq!(cell.fg, theme.dim);
    }
}
