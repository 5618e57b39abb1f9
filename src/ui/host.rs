//! [`Host`] implementation backed by the terminal
//!
//! The interpreter calls into the host between statements and during
//! blocking delay slices. `TuiHost` uses those calls to keep the screen
//! fresh and to turn key presses into pause/stop requests, so the UI stays
//! responsive even while a sketch spins in `while (true)` or sits in a long
//! delay inside a nested block.

use crate::interpreter::host::{Host, HostSignal};
use crate::ui::app::{Command, Dashboard};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{backend::Backend, Terminal};
use std::io;
use std::time::{Duration, Instant};

/// Minimum time between two redraws triggered from inside the interpreter
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Longest single wait for input while sleeping
const INPUT_POLL: Duration = Duration::from_millis(16);

pub struct TuiHost<B: Backend> {
    terminal: Terminal<B>,
    pub dashboard: Dashboard,
    epoch: Instant,
    last_draw: Instant,
    quit_requested: bool,
    restart_requested: bool,
    /// First terminal error hit inside an interpreter callback
    error: Option<io::Error>,
}

impl<B: Backend> TuiHost<B> {
    pub fn new(terminal: Terminal<B>, dashboard: Dashboard) -> Self {
        let now = Instant::now();
        TuiHost {
            terminal,
            dashboard,
            epoch: now,
            last_draw: now,
            quit_requested: false,
            restart_requested: false,
            error: None,
        }
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    pub fn draw(&mut self) -> io::Result<()> {
        let dashboard = &mut self.dashboard;
        self.terminal.draw(|frame| dashboard.render(frame))?;
        self.last_draw = Instant::now();
        Ok(())
    }

    /// Wait up to `timeout` for a key press and translate it
    pub fn next_command(&mut self, timeout: Duration) -> io::Result<Option<Command>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Ok(self.dashboard.handle_key(key))
            }
            _ => Ok(None),
        }
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart_requested)
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn fail(&mut self, err: io::Error) -> HostSignal {
        tracing::error!(error = %err, "terminal failure");
        self.error.get_or_insert(err);
        self.quit_requested = true;
        HostSignal::Stop
    }

    fn redraw_if_due(&mut self) -> Result<(), io::Error> {
        if self.last_draw.elapsed() >= FRAME_INTERVAL {
            self.draw()?;
        }
        Ok(())
    }

    /// What a command means to a session that is executing right now
    fn signal_for(&mut self, command: Command) -> HostSignal {
        match command {
            Command::TogglePause => HostSignal::Pause,
            Command::Stop => HostSignal::Stop,
            Command::Restart => {
                self.restart_requested = true;
                HostSignal::Stop
            }
            Command::Quit => {
                self.quit_requested = true;
                HostSignal::Stop
            }
        }
    }

    fn pump(&mut self, timeout: Duration) -> HostSignal {
        if let Err(err) = self.redraw_if_due() {
            return self.fail(err);
        }
        match self.next_command(timeout) {
            Ok(Some(command)) => self.signal_for(command),
            Ok(None) => HostSignal::Continue,
            Err(err) => self.fail(err),
        }
    }
}

impl<B: Backend> Host for TuiHost<B> {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn digital_write(&mut self, pin: u8, value: i64) {
        self.dashboard.record_write(pin, value);
    }

    fn poll(&mut self) -> HostSignal {
        self.pump(Duration::ZERO)
    }

    fn sleep(&mut self, ms: u64) -> HostSignal {
        let deadline = Instant::now() + Duration::from_millis(ms);
        loop {
            let now = Instant::now();
            if now >= deadline {
                return HostSignal::Continue;
            }
            let signal = self.pump((deadline - now).min(INPUT_POLL));
            if signal != HostSignal::Continue {
                return signal;
            }
        }
    }

    fn finished(&mut self) {
        self.dashboard.message = String::from("Sketch finished");
    }
}
