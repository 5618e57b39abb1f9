//! Board pane rendering: one row per pin with mode, level and button state

use crate::board::{PinLevel, PinMode};
use crate::interpreter::constants::ANALOG_PIN_BASE;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Snapshot of one pin for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinView {
    pub pin: u8,
    pub mode: PinMode,
    pub level: PinLevel,
    /// Output writes seen on this pin since the session started
    pub writes: u32,
}

/// Board label for a pin (`D13`, `A0`)
pub fn pin_label(pin: u8) -> String {
    let analog_base = ANALOG_PIN_BASE as u8;
    if pin >= analog_base {
        format!("A{}", pin - analog_base)
    } else {
        format!("D{pin}")
    }
}

fn pin_line(view: &PinView, is_selected: bool, is_held: bool) -> Line<'static> {
    let led_style = match view.level {
        PinLevel::High => Style::default()
            .fg(DEFAULT_THEME.pin_high)
            .add_modifier(Modifier::BOLD),
        PinLevel::Low => Style::default().fg(DEFAULT_THEME.pin_low),
    };
    let mode = match view.mode {
        PinMode::Output => Span::styled("OUT", Style::default().fg(DEFAULT_THEME.primary)),
        PinMode::Input => Span::styled(" IN", Style::default().fg(DEFAULT_THEME.type_name)),
    };
    let cursor = if is_selected { "›" } else { " " };

    let mut spans = vec![
        Span::styled(
            format!("{cursor}{:>4} ", pin_label(view.pin)),
            Style::default().fg(DEFAULT_THEME.fg),
        ),
        mode,
        Span::raw(" "),
        Span::styled("●", led_style),
        Span::styled(format!(" {:<4}", view.level.to_string()), led_style),
    ];
    if view.writes > 0 {
        spans.push(Span::styled(
            format!(" ×{}", view.writes),
            Style::default().fg(DEFAULT_THEME.comment),
        ));
    }
    if is_held {
        spans.push(Span::styled(
            " [pressed]",
            Style::default().fg(Color::Black).bg(DEFAULT_THEME.secondary),
        ));
    }

    let mut line = Line::from(spans);
    if is_selected {
        line.style = Style::default().bg(DEFAULT_THEME.current_line_bg);
    }
    line
}

/// Render the board pane.
///
/// `held` is a bitmask of pins whose button is held down.
pub fn render_board_pane(
    frame: &mut Frame,
    area: Rect,
    pins: &[PinView],
    selected_pin: u8,
    held: u32,
    is_focused: bool,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Board ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    let offset = (selected_pin as usize + 1).saturating_sub(visible_height);

    let lines: Vec<Line> = pins
        .iter()
        .skip(offset)
        .take(visible_height)
        .map(|view| {
            pin_line(
                view,
                view.pin == selected_pin,
                held & (1 << view.pin) != 0,
            )
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_label() {
        assert_eq!(pin_label(0), "D0");
        assert_eq!(pin_label(13), "D13");
        assert_eq!(pin_label(14), "A0");
        assert_eq!(pin_label(19), "A5");
    }

    #[test]
    fn test_pin_line_marks_held_button() {
        let view = PinView {
            pin: 2,
            mode: PinMode::Input,
            level: PinLevel::High,
            writes: 0,
        };
        let text: String = pin_line(&view, true, true)
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert!(text.contains("D2"));
        assert!(text.contains("HIGH"));
        assert!(text.contains("[pressed]"));
    }
}
