//! Status bar rendering with keybindings and run state

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Run state shown in the status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunBadge {
    #[default]
    Stopped,
    Running,
    Paused,
    Failed,
}

impl RunBadge {
    fn label(self) -> &'static str {
        match self {
            RunBadge::Stopped => " ■ STOPPED ",
            RunBadge::Running => " ▶ RUNNING ",
            RunBadge::Paused => " ❚❚ PAUSED ",
            RunBadge::Failed => " ✖ ERROR ",
        }
    }

    fn color(self) -> Color {
        match self {
            RunBadge::Stopped => DEFAULT_THEME.comment,
            RunBadge::Running => DEFAULT_THEME.success,
            RunBadge::Paused => DEFAULT_THEME.secondary,
            RunBadge::Failed => DEFAULT_THEME.error,
        }
    }
}

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    badge: RunBadge,
    elapsed_ms: u64,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let bar_bg = Style::default().bg(DEFAULT_THEME.current_line_bg);

    let left_spans = vec![
        Span::styled(
            badge.label(),
            Style::default()
                .bg(badge.color())
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {:.1}s ", elapsed_ms as f64 / 1000.0),
            bar_bg.fg(DEFAULT_THEME.primary),
        ),
        Span::styled(" | ", bar_bg.fg(DEFAULT_THEME.comment)),
        Span::styled(
            format!(" {message} "),
            bar_bg.fg(if badge == RunBadge::Failed {
                DEFAULT_THEME.error
            } else {
                DEFAULT_THEME.fg
            }),
        ),
    ];

    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(bar_bg)
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar_bg.fg(DEFAULT_THEME.fg);
    let sep_style = bar_bg.fg(DEFAULT_THEME.comment);

    let bindings = [
        (" ⎵ ", " pause "),
        (" r ", " restart "),
        (" s ", " stop "),
        (" ↑/↓ ", " pin "),
        (" ↵ ", " press "),
        (" q ", " quit "),
    ];
    let mut right_spans = Vec::with_capacity(bindings.len() * 3);
    for (i, (key, desc)) in bindings.iter().enumerate() {
        if i > 0 {
            right_spans.push(Span::styled("│", sep_style));
        }
        right_spans.push(Span::styled(*key, key_style));
        right_spans.push(Span::styled(*desc, desc_style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(bar_bg)
            .alignment(Alignment::Right),
        layout[1],
    );
}
