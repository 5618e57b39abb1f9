//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into four layers:
//!
//! - **[`app`]**: the dashboard state, key handling and the main event loop
//! - **[`host`]**: [`TuiHost`], the [`Host`] that redraws and reads keys while
//!   the interpreter is executing
//! - **[`panes`]**: render functions for each visible pane (sketch, board,
//!   log, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with a terminal and
//! the sketch text, then call [`App::run`].
//!
//! [`Host`]: crate::interpreter::host::Host
//! [`App::run`]: app::App::run

pub mod app;
pub mod host;
pub mod panes;
pub mod theme;

pub use app::App;
pub use host::TuiHost;
