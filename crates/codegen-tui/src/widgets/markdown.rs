//! Markdown rendering for terminal UI

use crate::theme::Theme;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Gutter drawn in front of every line of a fenced code block
pub const CODE_GUTTER: &str = "  │ ";

/// Convert markdown text to styled ratatui Lines.
///
/// Prose is word-wrapped to `width`, so every returned line fits on one
/// screen row. Fenced and indented code blocks become a gutter-indented block
/// in [`Theme::code_block_style`]; lines wider than `width` are cut with an
/// ellipsis rather than wrapped. Inline code keeps its backticks and uses
/// [`Theme::inline_code_style`]. Raw HTML is shown as plain text.
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_line: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = vec![theme.base_style()];
    let mut in_code_block = false;
    let mut code_block_content = String::new();
    let mut list_depth: usize = 0;

    let flush = |current_line: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>| {
        if !current_line.is_empty() {
            lines.extend(wrap_spans(std::mem::take(current_line), width));
        }
    };

    for event in Parser::new(text) {
        let current_style = style_stack.last().copied().unwrap_or_default();
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    flush(&mut current_line, &mut lines);
                    style_stack.push(match level {
                        HeadingLevel::H1 => theme
                            .accent_style()
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                        HeadingLevel::H2 => theme.accent_bold(),
                        _ => theme.accent_style(),
                    });
                }
                Tag::Paragraph => flush(&mut current_line, &mut lines),
                Tag::CodeBlock(kind) => {
                    flush(&mut current_line, &mut lines);
                    in_code_block = true;
                    code_block_content.clear();
                    let label = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => lang.to_string(),
                        _ => "code".to_string(),
                    };
                    lines.push(Line::from(Span::styled(
                        format!("  ┌ {}", label),
                        theme.dim_style(),
                    )));
                }
                Tag::List(_) => {
                    flush(&mut current_line, &mut lines);
                    list_depth += 1;
                }
                Tag::Item => {
                    flush(&mut current_line, &mut lines);
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    current_line.push(Span::styled(format!("{}• ", indent), theme.dim_style()));
                }
                Tag::Emphasis => style_stack.push(current_style.add_modifier(Modifier::ITALIC)),
                Tag::Strong => style_stack.push(current_style.add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => {
                    style_stack.push(current_style.add_modifier(Modifier::CROSSED_OUT))
                }
                Tag::Link { .. } => style_stack.push(Style::default().fg(theme.link)),
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    flush(&mut current_line, &mut lines);
                    style_stack.pop();
                }
                TagEnd::Paragraph => {
                    flush(&mut current_line, &mut lines);
                    if list_depth == 0 {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    let max = width.saturating_sub(CODE_GUTTER.chars().count());
                    for code_line in code_block_content.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("{}{}", CODE_GUTTER, truncate_to_width(code_line, max)),
                            theme.code_block_style(),
                        )));
                    }
                    lines.push(Line::from(""));
                }
                TagEnd::List(_) => {
                    flush(&mut current_line, &mut lines);
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::Item => flush(&mut current_line, &mut lines),
                TagEnd::HtmlBlock => {
                    flush(&mut current_line, &mut lines);
                    lines.push(Line::from(""));
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    style_stack.pop();
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    code_block_content.push_str(&text);
                } else {
                    current_line.push(Span::styled(text.into_string(), current_style));
                }
            }
            Event::Code(code) => {
                current_line.push(Span::styled(
                    format!("`{}`", code),
                    theme.inline_code_style(),
                ));
            }
            Event::Html(html) => {
                for raw in html.lines() {
                    current_line.push(Span::styled(raw.to_string(), current_style));
                    flush(&mut current_line, &mut lines);
                }
            }
            Event::InlineHtml(html) => {
                current_line.push(Span::styled(html.into_string(), current_style));
            }
            Event::SoftBreak => current_line.push(Span::raw(" ")),
            Event::HardBreak => flush(&mut current_line, &mut lines),
            Event::Rule => {
                flush(&mut current_line, &mut lines);
                lines.push(Line::from(Span::styled(
                    "─".repeat(width.min(40)),
                    theme.dim_style(),
                )));
            }
            _ => {}
        }
    }

    flush(&mut current_line, &mut lines);

    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }

    lines
}

/// Greedy word wrap to `width` columns, keeping each span's style.
///
/// Words wider than a whole row are split by character.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    if spans.iter().map(|s| s.width()).sum::<usize>() <= width {
        return vec![Line::from(spans)];
    }

    let mut lines = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in spans {
        let style = span.style;
        for piece in span.content.split_inclusive(' ') {
            let word = piece.trim_end_matches(' ');
            let word_width = word.width();

            if used > 0 && used + word_width > width {
                finish_row(&mut row, &mut lines);
                used = 0;
            }
            // no leading blanks on a continuation row
            if word.is_empty() && row.is_empty() && !lines.is_empty() {
                continue;
            }

            if word_width <= width {
                used += piece.width();
                row.push(Span::styled(piece.to_string(), style));
                continue;
            }

            let mut chunk = String::new();
            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if used + w > width && used > 0 {
                    row.push(Span::styled(std::mem::take(&mut chunk), style));
                    finish_row(&mut row, &mut lines);
                    used = 0;
                }
                chunk.push(c);
                used += w;
            }
            let trailing = &piece[word.len()..];
            chunk.push_str(trailing);
            used += trailing.len();
            row.push(Span::styled(chunk, style));
        }
    }

    if !row.is_empty() {
        finish_row(&mut row, &mut lines);
    }
    lines
}

/// Push `row` as a line, dropping its trailing blanks
fn finish_row(row: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>) {
    while let Some(last) = row.last_mut() {
        let trimmed = last.content.trim_end_matches(' ');
        if trimmed.is_empty() {
            row.pop();
        } else {
            if trimmed.len() != last.content.len() {
                last.content = trimmed.to_string().into();
            }
            break;
        }
    }
    lines.push(Line::from(std::mem::take(row)));
}

/// Cut `text` to at most `max` display columns, ending in `…` when cut
fn truncate_to_width(text: &str, max: usize) -> String {
    let total: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}
