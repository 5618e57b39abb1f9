//! Error and warning types for the sketch interpreter
//!
//! [`SketchError`] is the only error that reaches a caller: a sketch without
//! entry points cannot start a session, and the binary can fail to load a
//! file. Everything that goes wrong once a session is running is a
//! [`Warning`], which is logged and absorbed.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a session from starting
#[derive(Debug, Error)]
pub enum SketchError {
    #[error("Sketch parse failed: void setup() and void loop() not found")]
    MissingEntryPoints,

    #[error("failed to read sketch {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Recoverable conditions reported while a session runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("{op}: invalid pin {pin} (valid: 0-{max})")]
    InvalidPin { op: &'static str, pin: i64, max: u8 },

    #[error("delay({requested}) capped to {max} ms")]
    DelayClamped { requested: i64, max: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_messages() {
        let warning = Warning::InvalidPin {
            op: "pinMode",
            pin: 42,
            max: 19,
        };
        assert_eq!(warning.to_string(), "pinMode: invalid pin 42 (valid: 0-19)");

        let warning = Warning::DelayClamped {
            requested: 90000,
            max: 60000,
        };
        assert_eq!(warning.to_string(), "delay(90000) capped to 60000 ms");
    }

    #[test]
    fn test_parse_failure_message() {
        assert_eq!(
            SketchError::MissingEntryPoints.to_string(),
            "Sketch parse failed: void setup() and void loop() not found"
        );
    }
}
