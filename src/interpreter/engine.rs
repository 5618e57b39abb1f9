// Session state and scheduler for the sketch interpreter

use crate::board::BoardModel;
use crate::interpreter::config::SimConfig;
use crate::interpreter::errors::{SketchError, Warning};
use crate::interpreter::host::{Host, HostSignal};
use crate::interpreter::statements::{Flow, Scope};
use crate::log::EventLog;
use crate::parser::source::{parse_sketch, Sketch};
use crate::parser::statement::Statement;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Setup,
    Loop,
}

/// Run state of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunState {
    pub phase: Phase,
    pub paused: bool,
    /// Loop index to continue at after a pause
    pub paused_line_index: Option<usize>,
    /// Time left in the delay that was interrupted by a pause
    pub paused_delay_remaining: u64,
    /// Loop index an armed top-level delay resumes at
    pub saved_loop_line_index: Option<usize>,
}

/// Which body a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Setup,
    Loop,
}

/// Position of the line executed most recently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub block: Block,
    /// Index into the block's logical lines
    pub index: usize,
    /// 1-based line in the sketch text
    pub line_no: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WakeupKind {
    /// Continuation of a top-level `delay()`
    Delay,
    /// A loop pass (first pass, resumed pass or throttled repeat)
    Pass,
}

/// The one piece of pending work a running session can have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Wakeup {
    pub deadline_ms: u64,
    pub resume_at: usize,
    pub kind: WakeupKind,
}

/// How a top-level run over a block ended
enum RunOutcome {
    Completed,
    Suspended,
    /// Stopped or paused by the host while at this index
    Interrupted(usize),
}

/// Interpreter for one sketch, driven by a [`Host`].
///
/// `start()` runs `setup()` synchronously and schedules the first `loop()`
/// pass. From then on the host calls [`Interpreter::tick`], which runs
/// whatever work is due: a loop pass, or the continuation of a top-level
/// `delay()`.
pub struct Interpreter<H: Host> {
    pub(crate) host: H,
    pub(crate) config: SimConfig,
    pub(crate) board: BoardModel,
    /// Session-global variable store
    pub(crate) variables: FxHashMap<String, i64>,
    pub(crate) log: EventLog,

    /// Sketch text used by the next `start()`
    code: String,
    /// Sketch of the current session; shared so lines can be walked while
    /// the interpreter mutates itself
    sketch: Rc<Sketch>,

    pub(crate) state: RunState,
    pub(crate) wakeup: Option<Wakeup>,
    /// Host time at `start()`
    start_ms: u64,
    /// A pause arrived while it could not be honoured yet
    pause_requested: bool,
    current_line: Option<LinePosition>,
}

impl<H: Host> Interpreter<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, SimConfig::default())
    }

    pub fn with_config(host: H, config: SimConfig) -> Self {
        Interpreter {
            host,
            config,
            board: BoardModel::new(),
            variables: FxHashMap::default(),
            log: EventLog::new(config.log_capacity),
            code: String::new(),
            sketch: Rc::new(Sketch::default()),
            state: RunState::default(),
            wakeup: None,
            start_ms: 0,
            pause_requested: false,
            current_line: None,
        }
    }

    /// Replace the sketch text. A running session is unaffected until the
    /// next `start()`.
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Start a new session
    ///
    /// Stops the current session if there is one, resets the board and the
    /// variable store, parses the sketch, loads globals and runs `setup()` to
    /// completion. The first loop pass is scheduled for the next tick.
    pub fn start(&mut self) -> Result<(), SketchError> {
        if self.is_running() {
            self.stop();
        }

        self.board.reset();
        self.variables.clear();
        self.state = RunState::default();
        self.wakeup = None;
        self.pause_requested = false;
        self.current_line = None;
        self.start_ms = self.host.now_ms();

        let sketch = match parse_sketch(&self.code) {
            Ok(sketch) => sketch,
            Err(err) => {
                self.sketch = Rc::new(Sketch::default());
                self.log.error(err.to_string(), 0);
                self.host.finished();
                return Err(err);
            }
        };
        self.sketch = Rc::new(sketch);
        self.load_globals();

        self.state.phase = Phase::Setup;
        let setup_len = self.sketch.setup.len();
        self.log
            .info(format!("Running setup() — {setup_len} line(s)"), self.elapsed_ms());
        if let RunOutcome::Interrupted(_) = self.run_block(Block::Setup, 0) {
            // Stopped while in setup
            return Ok(());
        }

        let loop_len = self.sketch.loop_body.len();
        if loop_len == 0 {
            self.log
                .warning("loop() is empty — nothing to execute", self.elapsed_ms());
            self.state.phase = Phase::Idle;
            self.host.finished();
            return Ok(());
        }

        self.state.phase = Phase::Loop;
        self.log.info(
            format!("Entering loop() — {loop_len} lines, running continuously"),
            self.elapsed_ms(),
        );
        if std::mem::take(&mut self.pause_requested) {
            self.enter_pause(Some(0), 0);
        } else {
            let now = self.host.now_ms();
            self.schedule_pass(0, now);
        }
        Ok(())
    }

    /// End the session. Board and variables keep their last values.
    pub fn stop(&mut self) {
        let was_running = self.is_running();
        self.wakeup = None;
        self.state = RunState::default();
        self.pause_requested = false;
        if was_running {
            self.log.info("Interpreter stopped", self.elapsed_ms());
        }
    }

    /// Suspend the session, capturing the remaining time of an armed delay
    pub fn pause(&mut self) {
        if !self.is_running() || self.state.paused {
            return;
        }
        if self.state.phase == Phase::Setup {
            self.pause_requested = true;
            return;
        }

        let now = self.host.now_ms();
        match self.wakeup.take() {
            Some(Wakeup {
                deadline_ms,
                resume_at,
                kind: WakeupKind::Delay,
            }) => self.enter_pause(Some(resume_at), deadline_ms.saturating_sub(now)),
            Some(Wakeup {
                resume_at,
                kind: WakeupKind::Pass,
                ..
            }) => self.enter_pause(Some(resume_at), 0),
            None => self.enter_pause(None, 0),
        }
    }

    /// Continue a paused session where it left off
    pub fn resume(&mut self) {
        if !self.state.paused {
            return;
        }
        self.state.paused = false;

        let now = self.host.now_ms();
        let remaining = std::mem::take(&mut self.state.paused_delay_remaining);
        match self.state.paused_line_index.take() {
            Some(index) if remaining > 0 => {
                self.state.saved_loop_line_index = Some(index);
                self.wakeup = Some(Wakeup {
                    deadline_ms: now.saturating_add(remaining),
                    resume_at: index,
                    kind: WakeupKind::Delay,
                });
            }
            Some(index) => self.schedule_pass(index, now),
            None => self.schedule_pass(0, now),
        }
        self.log.info("Interpreter resumed", self.elapsed_ms());
    }

    pub fn is_running(&self) -> bool {
        self.state.phase != Phase::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Run the pending task if it is due. Returns true if anything ran.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() || self.state.paused {
            return false;
        }
        let Some(wakeup) = self.wakeup else {
            return false;
        };
        if self.host.now_ms() < wakeup.deadline_ms {
            return false;
        }

        self.wakeup = None;
        if wakeup.kind == WakeupKind::Delay {
            self.state.saved_loop_line_index = None;
        }
        self.run_loop_from(wakeup.resume_at);
        true
    }

    /// Host time at which the next task becomes due
    pub fn next_deadline(&self) -> Option<u64> {
        if !self.is_running() || self.state.paused {
            return None;
        }
        self.wakeup.map(|wakeup| wakeup.deadline_ms)
    }

    /// Milliseconds since the session started
    pub fn elapsed_ms(&self) -> u64 {
        self.host.now_ms().saturating_sub(self.start_ms)
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    /// Mutable board access, used to install an input source
    pub fn board_mut(&mut self) -> &mut BoardModel {
        &mut self.board
    }

    /// Variables sorted by name
    pub fn variables(&self) -> Vec<(String, i64)> {
        let mut variables: Vec<(String, i64)> = self
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        variables.sort();
        variables
    }

    pub fn variable(&self, name: &str) -> Option<i64> {
        self.variables.get(name).copied()
    }

    pub fn current_line(&self) -> Option<LinePosition> {
        self.current_line
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Log a recoverable condition at Warning level
    pub(crate) fn warn(&mut self, warning: Warning) {
        let elapsed = self.elapsed_ms();
        self.log.warning(warning.to_string(), elapsed);
    }

    /// React to a host signal. Returns true if execution must unwind.
    ///
    /// Stop takes effect at once. A pause during `setup()` is remembered and
    /// applied once setup has finished.
    pub(crate) fn interrupted_by(&mut self, signal: HostSignal) -> bool {
        match signal {
            HostSignal::Continue => false,
            HostSignal::Stop => {
                self.stop();
                true
            }
            HostSignal::Pause => {
                self.pause_requested = true;
                self.state.phase != Phase::Setup
            }
        }
    }

    /// Arm a top-level delay continuation
    pub(crate) fn arm_delay(&mut self, duration_ms: u64, resume_at: usize) {
        let now = self.host.now_ms();
        self.state.saved_loop_line_index = Some(resume_at);
        self.wakeup = Some(Wakeup {
            deadline_ms: now.saturating_add(duration_ms),
            resume_at,
            kind: WakeupKind::Delay,
        });
    }

    fn schedule_pass(&mut self, resume_at: usize, deadline_ms: u64) {
        self.wakeup = Some(Wakeup {
            deadline_ms,
            resume_at,
            kind: WakeupKind::Pass,
        });
    }

    fn enter_pause(&mut self, index: Option<usize>, delay_remaining: u64) {
        self.wakeup = None;
        self.state.paused = true;
        self.state.paused_line_index = index;
        self.state.paused_delay_remaining = delay_remaining;
        self.state.saved_loop_line_index = None;
        self.log.info("Interpreter paused", self.elapsed_ms());
    }

    /// Evaluate top-level declarations into the variable store
    fn load_globals(&mut self) {
        let sketch = Rc::clone(&self.sketch);
        for line in &sketch.globals {
            match &line.statement {
                Statement::Declare { bindings } => {
                    for (name, init) in bindings {
                        let value = self.eval_expr(init);
                        self.variables.insert(name.clone(), value);
                    }
                }
                Statement::ReadMillis { .. } | Statement::ReadPin { .. } => {
                    self.execute_line(std::slice::from_ref(line), 0, Scope::Setup);
                }
                _ => {}
            }
        }

        if !self.variables.is_empty() {
            let listing = self
                .variables()
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            self.log
                .info(format!("Global variables: {listing}"), self.elapsed_ms());
        }
    }

    /// One pass over `loop()` starting at `start`
    fn run_loop_from(&mut self, start: usize) {
        let start = if start >= self.sketch.loop_body.len() {
            0
        } else {
            start
        };

        match self.run_block(Block::Loop, start) {
            RunOutcome::Completed => {
                let next = self.host.now_ms().saturating_add(self.config.loop_throttle_ms);
                self.schedule_pass(0, next);
            }
            RunOutcome::Suspended => {}
            RunOutcome::Interrupted(index) => {
                if self.is_running() && std::mem::take(&mut self.pause_requested) {
                    self.enter_pause(Some(index), 0);
                }
            }
        }
    }

    /// Execute a block's lines from `start` at top level, polling the host
    /// before each line
    fn run_block(&mut self, block: Block, start: usize) -> RunOutcome {
        let sketch = Rc::clone(&self.sketch);
        let (lines, scope) = match block {
            Block::Setup => (&sketch.setup, Scope::Setup),
            Block::Loop => (&sketch.loop_body, Scope::Loop),
        };

        let mut index = start;
        while index < lines.len() {
            let signal = self.host.poll();
            if self.interrupted_by(signal) {
                return RunOutcome::Interrupted(index);
            }

            self.current_line = Some(LinePosition {
                block,
                index,
                line_no: lines[index].line_no,
            });
            match self.execute_line(lines, index, scope) {
                Flow::Next(next) => index = next,
                Flow::Break => index = self.break_target(lines, index),
                Flow::Suspend => return RunOutcome::Suspended,
                Flow::Interrupt => return RunOutcome::Interrupted(index),
            }
        }
        RunOutcome::Completed
    }
}
