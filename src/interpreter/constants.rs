// Constants for the sketch interpreter

/// Longest accepted `delay()`; longer requests are clamped
pub const MAX_DELAY_MS: u64 = 60_000;

/// Length of one blocking delay slice
/// Between slices the host gets a chance to redraw and read input
pub const DELAY_SLICE_MS: u64 = 20;

/// Pause between two loop passes that did not suspend on a delay
pub const LOOP_THROTTLE_MS: u64 = 1;

/// Default capacity of the session event log
pub const LOG_CAPACITY: usize = 500;

/// Pin of the on-board LED (`LED_BUILTIN`)
pub const LED_BUILTIN: i64 = 13;

/// First analog pin (`A0`); `A1`..`A5` follow
pub const ANALOG_PIN_BASE: i64 = 14;
