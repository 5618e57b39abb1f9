//! Event log pane rendering

use crate::log::{LogEntry, LogLevel};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Info => Style::default().fg(DEFAULT_THEME.comment),
        LogLevel::Warning => Style::default().fg(DEFAULT_THEME.warning),
        LogLevel::Error => Style::default()
            .fg(DEFAULT_THEME.error)
            .add_modifier(Modifier::BOLD),
    }
}

/// Render the event log pane.
///
/// `scroll_offset` of `usize::MAX` follows the newest entry.
pub fn render_log_pane(
    frame: &mut Frame,
    area: Rect,
    entries: &[LogEntry],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if entries.is_empty() {
        let paragraph = Paragraph::new("(no messages)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let max_scroll = entries.len().saturating_sub(visible_height);
    *scroll_offset = (*scroll_offset).min(max_scroll);

    let items: Vec<ListItem> = entries
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>7.3}s ", entry.elapsed_ms as f64 / 1000.0),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(format!("{:<5} ", entry.level.to_string()), level_style(entry.level)),
                Span::styled(entry.message.as_str(), Style::default().fg(DEFAULT_THEME.fg)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
