//! Main TUI application state and logic

use crate::board::{PinLevel, PinMode, PIN_COUNT};
use crate::interpreter::config::SimConfig;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::host::Host;
use crate::log::LogEntry;
use crate::ui::host::TuiHost;
use crate::ui::panes::{self, PinView, RunBadge, SourceScrollState};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Longest wait for input when nothing is scheduled sooner
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Board,
    Log,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> log -> board)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Log,
            FocusedPane::Log => FocusedPane::Board,
            FocusedPane::Board => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Board,
            FocusedPane::Log => FocusedPane::Source,
            FocusedPane::Board => FocusedPane::Log,
        }
    }
}

/// Session-level request made from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Stop,
    Restart,
    Quit,
}

/// Everything the panes draw.
///
/// The app copies interpreter state in here between ticks. While the
/// interpreter is executing, only the host touches it (pin writes, key
/// presses), so the screen can be redrawn without borrowing the interpreter.
pub struct Dashboard {
    pub source: String,
    pub pins: Vec<PinView>,
    pub log: Vec<LogEntry>,
    /// 1-based sketch line executed most recently
    pub current_line: Option<usize>,
    pub badge: RunBadge,
    pub elapsed_ms: u64,
    pub message: String,
    pub focused_pane: FocusedPane,
    pub selected_pin: u8,
    /// Bitmask of held buttons, shared with the board's input source
    held: Rc<Cell<u32>>,
    write_counts: [u32; PIN_COUNT],
    source_scroll: SourceScrollState,
    log_scroll: usize,
    log_follow: bool,
}

impl Dashboard {
    pub fn new(source: String, held: Rc<Cell<u32>>) -> Self {
        Dashboard {
            source,
            pins: Vec::new(),
            log: Vec::new(),
            current_line: None,
            badge: RunBadge::Stopped,
            elapsed_ms: 0,
            message: String::from("Ready!"),
            focused_pane: FocusedPane::Board,
            selected_pin: 2,
            held,
            write_counts: [0; PIN_COUNT],
            source_scroll: SourceScrollState::default(),
            log_scroll: 0,
            log_follow: true,
        }
    }

    pub fn is_held(&self, pin: u8) -> bool {
        self.held.get() & (1 << pin) != 0
    }

    pub fn toggle_held(&mut self, pin: u8) {
        self.held.set(self.held.get() ^ (1 << pin));
        let state = if self.is_held(pin) {
            "pressed"
        } else {
            "released"
        };
        self.message = format!("Button on {} {state}", panes::board::pin_label(pin));
    }

    /// Mirror a `digitalWrite` as soon as the host sees it
    pub fn record_write(&mut self, pin: u8, value: i64) {
        let index = pin as usize;
        if let Some(count) = self.write_counts.get_mut(index) {
            *count = count.saturating_add(1);
        }
        if let Some(view) = self.pins.get_mut(index) {
            view.writes = self.write_counts[index];
            if view.mode.is_output() {
                view.level = PinLevel::from_value(value);
            }
        }
    }

    pub fn reset_write_counts(&mut self) {
        self.write_counts = [0; PIN_COUNT];
    }

    /// Replace the pin table from a board snapshot
    pub fn set_pins(&mut self, pins: Vec<(u8, PinMode, u8)>) {
        self.pins = pins
            .into_iter()
            .map(|(pin, mode, level)| PinView {
                pin,
                mode,
                level: PinLevel::from_value(level as i64),
                writes: self.write_counts.get(pin as usize).copied().unwrap_or(0),
            })
            .collect();
    }

    /// Handle keyboard events. Keys that only affect the view are handled
    /// here; session requests are returned.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Command::Quit),
            KeyCode::Char(' ') => return Some(Command::TogglePause),
            KeyCode::Char('r') | KeyCode::Char('R') => return Some(Command::Restart),
            KeyCode::Char('s') | KeyCode::Char('S') => return Some(Command::Stop),
            KeyCode::Tab => self.focused_pane = self.focused_pane.next(),
            KeyCode::BackTab => self.focused_pane = self.focused_pane.prev(),
            KeyCode::Enter | KeyCode::Char('b') => self.toggle_held(self.selected_pin),
            KeyCode::Up => self.scroll(-1),
            KeyCode::Down => self.scroll(1),
            KeyCode::End => self.log_follow = true,
            _ => {}
        }
        None
    }

    fn scroll(&mut self, delta: i32) {
        match self.focused_pane {
            FocusedPane::Board => {
                let max = PIN_COUNT as i32 - 1;
                self.selected_pin = (self.selected_pin as i32 + delta).clamp(0, max) as u8;
            }
            FocusedPane::Log => {
                self.log_follow = false;
                self.log_scroll = if delta < 0 {
                    self.log_scroll.saturating_sub(1)
                } else {
                    self.log_scroll.saturating_add(1)
                };
            }
            FocusedPane::Source => {
                let row = self.source_scroll.target_line_row.unwrap_or(0) as i32 + delta;
                self.source_scroll.target_line_row = Some(row.max(0) as usize);
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: Sketch (top) | Log (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source,
            self.current_line,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        if self.log_follow {
            self.log_scroll = usize::MAX;
        }
        panes::render_log_pane(
            frame,
            left_rows[1],
            &self.log,
            self.focused_pane == FocusedPane::Log,
            &mut self.log_scroll,
        );

        panes::render_board_pane(
            frame,
            columns[1],
            &self.pins,
            self.selected_pin,
            self.held.get(),
            self.focused_pane == FocusedPane::Board,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.message,
            self.badge,
            self.elapsed_ms,
        );
    }
}

/// The main application: an interpreter driven by the terminal host
pub struct App<B: Backend> {
    interpreter: Interpreter<TuiHost<B>>,
    /// The last `start()` failed to parse the sketch
    failed: bool,
}

impl<B: Backend> App<B> {
    pub fn new(terminal: Terminal<B>, source: String, config: SimConfig) -> Self {
        let held = Rc::new(Cell::new(0u32));
        let dashboard = Dashboard::new(source.clone(), Rc::clone(&held));
        let mut interpreter = Interpreter::with_config(TuiHost::new(terminal, dashboard), config);
        interpreter
            .board_mut()
            .set_input_source(Box::new(move |pin| ((held.get() >> pin) & 1) as u8));
        interpreter.set_code(source);
        App {
            interpreter,
            failed: false,
        }
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        self.interpreter.host_mut().terminal_mut()
    }

    pub fn interpreter(&self) -> &Interpreter<TuiHost<B>> {
        &self.interpreter
    }

    /// Run the TUI application until the user quits
    pub fn run(&mut self) -> io::Result<()> {
        self.restart();
        loop {
            self.sync();
            let host = self.interpreter.host_mut();
            host.draw()?;
            if let Some(err) = host.take_error() {
                return Err(err);
            }
            if host.quit_requested() {
                break;
            }
            if host.take_restart_request() {
                self.restart();
                continue;
            }

            self.interpreter.tick();

            let now = self.interpreter.host().now_ms();
            let timeout = self
                .interpreter
                .next_deadline()
                .map_or(IDLE_POLL, |deadline| {
                    Duration::from_millis(deadline.saturating_sub(now)).min(IDLE_POLL)
                });
            if let Some(command) = self.interpreter.host_mut().next_command(timeout)? {
                self.apply(command);
            }
        }

        self.interpreter.stop();
        Ok(())
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::TogglePause => {
                if self.interpreter.is_paused() {
                    self.interpreter.resume();
                    self.set_message("Resumed");
                } else if self.interpreter.is_running() {
                    self.interpreter.pause();
                    self.set_message("Paused");
                }
            }
            Command::Stop => {
                self.interpreter.stop();
                self.set_message("Stopped");
            }
            Command::Restart => self.restart(),
            Command::Quit => self.interpreter.host_mut().request_quit(),
        }
    }

    fn restart(&mut self) {
        self.interpreter.host_mut().dashboard.reset_write_counts();
        match self.interpreter.start() {
            Ok(()) => {
                self.failed = false;
                if self.interpreter.is_running() {
                    self.set_message("Running");
                }
            }
            Err(err) => {
                self.failed = true;
                self.set_message(&err.to_string());
            }
        }
    }

    fn set_message(&mut self, message: &str) {
        self.interpreter.host_mut().dashboard.message = message.to_string();
    }

    /// Copy interpreter state into the dashboard
    fn sync(&mut self) {
        let pins = self.interpreter.board().pins();
        let log: Vec<LogEntry> = self.interpreter.log().entries().cloned().collect();
        let current_line = self.interpreter.current_line().map(|pos| pos.line_no);
        let elapsed_ms = self.interpreter.elapsed_ms();
        let badge = if self.interpreter.is_paused() {
            RunBadge::Paused
        } else if self.interpreter.is_running() {
            RunBadge::Running
        } else if self.failed {
            RunBadge::Failed
        } else {
            RunBadge::Stopped
        };

        let dashboard = &mut self.interpreter.host_mut().dashboard;
        dashboard.set_pins(pins);
        dashboard.log = log;
        dashboard.current_line = current_line;
        dashboard.badge = badge;
        if badge == RunBadge::Running || badge == RunBadge::Paused {
            dashboard.elapsed_ms = elapsed_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(
            "void setup() {}\nvoid loop() {}\n".to_string(),
            Rc::new(Cell::new(0)),
        )
    }

    #[test]
    fn test_session_keys_become_commands() {
        let mut dash = dashboard();
        assert_eq!(dash.handle_key(key(KeyCode::Char(' '))), Some(Command::TogglePause));
        assert_eq!(dash.handle_key(key(KeyCode::Char('r'))), Some(Command::Restart));
        assert_eq!(dash.handle_key(key(KeyCode::Char('s'))), Some(Command::Stop));
        assert_eq!(dash.handle_key(key(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(dash.handle_key(key(KeyCode::Tab)), None);
    }

    #[test]
    fn test_button_toggle_updates_shared_mask() {
        let held = Rc::new(Cell::new(0));
        let mut dash = Dashboard::new(String::new(), Rc::clone(&held));
        dash.handle_key(key(KeyCode::Down));
        assert_eq!(dash.selected_pin, 3);
        dash.handle_key(key(KeyCode::Enter));
        assert_eq!(held.get(), 1 << 3);
        assert!(dash.message.contains("pressed"));
        dash.handle_key(key(KeyCode::Char('b')));
        assert_eq!(held.get(), 0);
    }

    #[test]
    fn test_pin_selection_is_clamped() {
        let mut dash = dashboard();
        for _ in 0..40 {
            dash.handle_key(key(KeyCode::Down));
        }
        assert_eq!(dash.selected_pin, PIN_COUNT as u8 - 1);
        for _ in 0..40 {
            dash.handle_key(key(KeyCode::Up));
        }
        assert_eq!(dash.selected_pin, 0);
    }

    #[test]
    fn test_record_write_updates_output_pins_only() {
        let mut dash = dashboard();
        dash.set_pins(vec![(0, PinMode::Input, 0), (1, PinMode::Output, 0)]);
        dash.record_write(1, 5);
        dash.record_write(0, 1);
        assert_eq!(dash.pins[1].level, PinLevel::High);
        assert_eq!(dash.pins[1].writes, 1);
        assert_eq!(dash.pins[0].level, PinLevel::Low);
        assert_eq!(dash.pins[0].writes, 1);
    }

    #[test]
    fn test_render_draws_all_panes() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let mut dash = dashboard();
        dash.set_pins((0..PIN_COUNT as u8).map(|p| (p, PinMode::Input, 0)).collect());
        terminal.draw(|frame| dash.render(frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Sketch"));
        assert!(text.contains("Board"));
        assert!(text.contains("Log"));
        assert!(text.contains("STOPPED"));
    }

    #[test]
    fn test_app_reports_parse_failure() {
        let terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let mut app = App::new(terminal, "int x = 1;".to_string(), SimConfig::default());
        app.restart();
        app.sync();
        let dash = &app.interpreter().host().dashboard;
        assert_eq!(dash.badge, RunBadge::Failed);
        assert!(dash.message.contains("not found"));
    }
}
