//! Virtual digital I/O board
//!
//! The board is the only hardware the simulator knows about: a fixed table of
//! digital pins, each with an independent mode and output latch.
//!
//! # Pin numbering
//!
//! Pins follow the Uno layout:
//! - `0..=13`: digital pins
//! - `14..=19`: analog pins used as digital I/O (`A0`..`A5`)
//!
//! # Reads
//!
//! A read returns the output latch only when the pin is configured as an
//! output. Every other pin is driven from outside the board, so the read is
//! answered by the injected input source (a simulated button, for example),
//! or `0` when no source is installed.

use rustc_hash::FxHashMap;
use std::fmt;

/// Highest addressable pin number on the simulated board
pub const MAX_PIN: u8 = 19;

/// Number of addressable pins
pub const PIN_COUNT: usize = MAX_PIN as usize + 1;

/// Externally observed level of a pin, supplied by the host
pub type InputSource = Box<dyn Fn(u8) -> u8>;

/// Direction a pin is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinMode {
    #[default]
    Input,
    Output,
}

impl PinMode {
    pub fn is_output(self) -> bool {
        matches!(self, PinMode::Output)
    }
}

/// Digital level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

impl PinLevel {
    /// Any nonzero value is `High`
    pub fn from_value(value: i64) -> Self {
        if value != 0 {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => write!(f, "LOW"),
            PinLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Returns true if `pin` addresses a pin on the board
pub fn is_valid_pin(pin: i64) -> bool {
    (0..=MAX_PIN as i64).contains(&pin)
}

/// Pin table of the simulated board.
///
/// All operations are total: unknown or out-of-range pins read as `0` and
/// writes to them are ignored.
#[derive(Default)]
pub struct BoardModel {
    levels: FxHashMap<u8, PinLevel>,
    modes: FxHashMap<u8, PinMode>,
    input_source: Option<InputSource>,
}

impl BoardModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the function answering reads of non-output pins.
    ///
    /// The source survives [`BoardModel::reset`]; it models the wiring around
    /// the board, not interpreter state.
    pub fn set_input_source(&mut self, source: InputSource) {
        self.input_source = Some(source);
    }

    /// Store `value` (coerced to 0/1) in the pin's output latch
    pub fn set_digital_pin(&mut self, pin: i64, value: i64) {
        if !is_valid_pin(pin) {
            return;
        }
        self.levels.insert(pin as u8, PinLevel::from_value(value));
    }

    /// Read the pin: the latch for outputs, the input source for everything else
    pub fn get_digital_pin(&self, pin: i64) -> u8 {
        if !is_valid_pin(pin) {
            return 0;
        }
        let pin = pin as u8;
        if self.pin_mode(pin).is_output() {
            return self.latch(pin).as_u8();
        }
        match &self.input_source {
            Some(source) => source(pin),
            None => 0,
        }
    }

    pub fn set_pin_mode(&mut self, pin: u8, mode: PinMode) {
        self.modes.insert(pin, mode);
    }

    /// Unset pins report `Input`
    pub fn pin_mode(&self, pin: u8) -> PinMode {
        self.modes.get(&pin).copied().unwrap_or_default()
    }

    /// Raw output latch, regardless of mode
    pub fn latch(&self, pin: u8) -> PinLevel {
        self.levels.get(&pin).copied().unwrap_or_default()
    }

    /// Clear latches and modes. The input source is kept.
    pub fn reset(&mut self) {
        self.levels.clear();
        self.modes.clear();
    }

    /// Snapshot of every pin as `(pin, mode, observed level)`, for display
    pub fn pins(&self) -> Vec<(u8, PinMode, u8)> {
        (0..=MAX_PIN)
            .map(|pin| (pin, self.pin_mode(pin), self.get_digital_pin(pin as i64)))
            .collect()
    }
}

impl fmt::Debug for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardModel")
            .field("levels", &self.levels)
            .field("modes", &self.modes)
            .field("input_source", &self.input_source.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_output_pin_reads_latch() {
        let mut board = BoardModel::new();
        board.set_pin_mode(13, PinMode::Output);
        board.set_digital_pin(13, 1);
        assert_eq!(board.get_digital_pin(13), 1);
        board.set_digital_pin(13, 0);
        assert_eq!(board.get_digital_pin(13), 0);
    }

    #[test]
    fn test_input_pin_without_source_reads_zero() {
        let mut board = BoardModel::new();
        board.set_digital_pin(2, 1);
        assert_eq!(board.get_digital_pin(2), 0);
        assert_eq!(board.latch(2), PinLevel::High);
    }

    #[test]
    fn test_out_of_range_pins_are_ignored() {
        let mut board = BoardModel::new();
        board.set_digital_pin(20, 1);
        board.set_digital_pin(-1, 1);
        assert_eq!(board.get_digital_pin(20), 0);
        assert_eq!(board.get_digital_pin(-1), 0);
        assert!(board.levels.is_empty());
    }

    #[test]
    fn test_reset_keeps_input_source() {
        let mut board = BoardModel::new();
        board.set_input_source(Box::new(|pin| if pin == 2 { 1 } else { 0 }));
        board.set_pin_mode(13, PinMode::Output);
        board.set_digital_pin(13, 1);
        board.reset();

        assert_eq!(board.pin_mode(13), PinMode::Input);
        assert_eq!(board.latch(13), PinLevel::Low);
        assert_eq!(board.get_digital_pin(2), 1);
    }

    #[test]
    fn test_unset_pin_mode_is_input() {
        let board = BoardModel::new();
        assert_eq!(board.pin_mode(7), PinMode::Input);
    }

    proptest! {
        #[test]
        fn output_latch_round_trips(pin in 0i64..=19, value in any::<i64>()) {
            let mut board = BoardModel::new();
            board.set_pin_mode(pin as u8, PinMode::Output);
            board.set_digital_pin(pin, value);
            prop_assert_eq!(board.get_digital_pin(pin), if value != 0 { 1 } else { 0 });
        }

        #[test]
        fn input_pin_follows_source(pin in 0i64..=19, written in any::<i64>(), level in 0u8..=1) {
            let mut board = BoardModel::new();
            board.set_input_source(Box::new(move |_| level));
            board.set_digital_pin(pin, written);
            prop_assert_eq!(board.get_digital_pin(pin), level);
        }
    }
}
