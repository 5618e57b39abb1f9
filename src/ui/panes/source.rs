//! Sketch pane rendering with syntax highlighting
//!
//! Shows the loaded sketch with line numbers, basic highlighting for the
//! Arduino subset and the line the interpreter executed most recently.
//! The view scrolls to keep that line at a stable row while the sketch runs.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Simple syntax highlighting for sketch source
fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c == '/' && matches!(chars.get(i + 1), Some((_, '/'))) {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            spans.push(Span::styled(
                &line[offset..],
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            return Line::from(spans);
        }

        if c == '"' || c == '\'' {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != c {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            let end_offset = chars.get(end).map_or(line.len(), |(o, _)| *o);
            spans.push(Span::styled(
                &line[offset..end_offset],
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if c == '#' && current_word.is_empty() && line[..offset].trim().is_empty() {
            spans.push(Span::styled(
                &line[offset..],
                Style::default().fg(DEFAULT_THEME.keyword),
            ));
            return Line::from(spans);
        }

        if !c.is_alphanumeric() && c != '_' {
            if !current_word.is_empty() {
                let style = get_keyword_style(&current_word, c == '(');
                spans.push(Span::styled(std::mem::take(&mut current_word), style));
            }

            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    if !current_word.is_empty() {
        let style = get_keyword_style(&current_word, false);
        spans.push(Span::styled(current_word, style));
    }

    Line::from(spans)
}

fn get_keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "int" | "char" | "void" | "bool" | "boolean" | "byte" | "long" | "short" | "unsigned"
        | "const" | "static" | "volatile" | "float" | "double" | "word" | "uint8_t"
        | "uint16_t" | "uint32_t" | "int8_t" | "int16_t" | "int32_t" | "size_t" => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        "return" | "if" | "else" | "while" | "for" | "do" | "switch" | "case" | "default"
        | "break" | "continue" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "HIGH" | "LOW" | "OUTPUT" | "INPUT" | "INPUT_PULLUP" | "LED_BUILTIN" | "true"
        | "false" => Style::default().fg(DEFAULT_THEME.number),
        _ if word.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Scroll state for the source pane
#[derive(Debug, Clone, Default)]
pub struct SourceScrollState {
    pub offset: usize,
    /// Visual row the current line is pinned to (None = not initialized yet)
    pub target_line_row: Option<usize>,
}

/// Render the source code pane.
///
/// `current_line` is 1-based; `None` leaves the scroll position alone.
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current_line: Option<usize>,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Sketch ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    if let Some(line) = current_line.filter(|&l| l > 0 && l <= total_lines) {
        scroll_state.offset = (line - 1).saturating_sub(target_row);
    }
    let max_scroll = total_lines.saturating_sub(visible_height);
    scroll_state.offset = scroll_state.offset.min(max_scroll);

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = current_line == Some(line_num);
            let marker = if is_current { "▶" } else { " " };

            let num_style = if is_current {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut content_line = highlight_source_code(line);
            if is_current {
                let current_bg = Style::default().bg(DEFAULT_THEME.current_line_bg);
                for span in &mut content_line.spans {
                    span.style = span.style.patch(current_bg);
                }
            }

            let mut final_spans = vec![Span::styled(format!("{marker}{line_num:4} "), num_style)];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}
