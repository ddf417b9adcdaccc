//! Color theme support

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    /// Secondary text, placeholders and disabled input
    pub dim: Color,
    /// Prompts, the user header and focus borders
    pub accent: Color,
    /// The assistant header
    pub reply: Color,
    pub error: Color,
    pub warning: Color,
    pub border: Color,
    /// Fenced blocks and inline code spans
    pub code: Color,
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            reply: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            border: Color::DarkGray,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            reply: Color::Rgb(0, 120, 0),
            error: Color::Red,
            warning: Color::Rgb(180, 120, 0),
            border: Color::Gray,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn reply_bold(&self) -> Style {
        Style::default()
            .fg(self.reply)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    /// Style for lines inside a fenced code block
    pub fn code_block_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    /// Style for an inline code span
    pub fn inline_code_style(&self) -> Style {
        Style::default().fg(self.code).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }
}
