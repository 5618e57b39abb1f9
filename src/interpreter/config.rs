//! Session configuration

use crate::board::MAX_PIN;
use crate::interpreter::constants::{DELAY_SLICE_MS, LOG_CAPACITY, LOOP_THROTTLE_MS, MAX_DELAY_MS};

/// Tunables for an interpreter session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Highest pin accepted by `pinMode`, `digitalWrite` and `digitalRead`
    pub max_pin: u8,
    pub max_delay_ms: u64,
    pub delay_slice_ms: u64,
    pub loop_throttle_ms: u64,
    pub log_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            max_pin: MAX_PIN,
            max_delay_ms: MAX_DELAY_MS,
            delay_slice_ms: DELAY_SLICE_MS,
            loop_throttle_ms: LOOP_THROTTLE_MS,
            log_capacity: LOG_CAPACITY,
        }
    }
}

impl SimConfig {
    /// Pin range is capped at the board's physical range
    pub fn with_max_pin(mut self, max_pin: u8) -> Self {
        self.max_pin = max_pin.min(MAX_PIN);
        self
    }

    pub fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// A zero slice would never make progress, so it is raised to 1 ms
    pub fn with_delay_slice_ms(mut self, ms: u64) -> Self {
        self.delay_slice_ms = ms.max(1);
        self
    }

    pub fn with_loop_throttle_ms(mut self, ms: u64) -> Self {
        self.loop_throttle_ms = ms;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.max_pin, 19);
        assert_eq!(config.max_delay_ms, 60_000);
        assert_eq!(config.delay_slice_ms, 20);
        assert_eq!(config.loop_throttle_ms, 1);
        assert_eq!(config.log_capacity, 500);
    }

    #[test]
    fn test_setters_clamp() {
        let config = SimConfig::default()
            .with_max_pin(40)
            .with_delay_slice_ms(0)
            .with_loop_throttle_ms(5);
        assert_eq!(config.max_pin, 19);
        assert_eq!(config.delay_slice_ms, 1);
        assert_eq!(config.loop_throttle_ms, 5);
    }
}
