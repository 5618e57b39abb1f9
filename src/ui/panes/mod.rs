//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: Sketch display with syntax highlighting and current line indicator
//! - [`board`]: Pin table with modes, levels and held buttons
//! - [`log`]: Session event log
//! - [`status`]: Status bar with keybindings and run state
//!
//! Each pane module exports a primary `render_*` function plus whatever
//! small state type it needs between frames.

pub mod board;
pub mod log;
pub mod source;
pub mod status;

pub use board::{render_board_pane, PinView};
pub use log::render_log_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::{render_status_bar, RunBadge};
