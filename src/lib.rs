//! # Introduction
//!
//! sketchsim runs Arduino-style sketches against a virtual digital I/O board
//! without compiling them. The sketch text is interpreted line by line, with
//! `delay()` driven by the host's clock, so a run can be watched live in a
//! terminal UI, paused and resumed mid-delay, or replayed in virtual time.
//!
//! ## Execution pipeline
//!
//! ```text
//! Sketch text → Parser → Classified lines → Interpreter ⇄ Host → Board / UI
//! ```
//!
//! 1. [`parser`]: strips comments, extracts `setup()`/`loop()`, splits them
//!    into logical lines and classifies each line once.
//! 2. [`interpreter`]: executes lines against the variable store and the
//!    board, and schedules loop passes and delay continuations.
//! 3. [`board`]: the pin table (modes, output latches, external inputs).
//! 4. [`log`]: the session event log.
//! 5. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Supported sketch subset
//!
//! Calls: `pinMode`, `digitalWrite`, `digitalRead`, `delay`, `millis`.
//! Control flow: `if/else`, `for`, `while`, `switch/case`, `break`.
//! Values: 64-bit integers with the usual arithmetic and bitwise operators.

pub mod board;
pub mod interpreter;
pub mod log;
pub mod parser;
pub mod ui;
