//! Sketch interpreter
//!
//! This module provides the execution side of the simulator:
//! - [`engine`]: the session (run state, scheduler, lifecycle)
//! - [`host`]: the [`Host`] seam plus the wall-clock and virtual hosts
//! - [`errors`]: parse errors and runtime warnings
//!
//! # Execution Model
//!
//! `setup()` runs to completion inside `start()`. `loop()` then runs as a
//! series of passes scheduled on the host's clock: a pass ends when the
//! body completes (the next pass follows after a short throttle) or when a
//! `delay()` at the top of `loop()` arms a continuation. Delays anywhere else
//! block in short slices, handing control to the host between slices so it
//! can keep its UI alive and deliver pause/stop requests.
//!
//! Line execution is spread over several files, each adding
//! `impl Interpreter` methods: `statements` (single lines), `loops`
//! (`for`/`while`), `branches` (`if`/`switch`) and `expressions` (expression
//! and condition evaluation).

mod branches;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
pub mod host;
mod loops;
mod statements;

pub use config::SimConfig;
pub use engine::{Block, Interpreter, LinePosition, Phase, RunState};
pub use errors::{SketchError, Warning};
pub use host::{Host, HostSignal, SystemHost, VirtualHost, WriteEvent};
