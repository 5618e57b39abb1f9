//! Host seam
//!
//! The interpreter owns no clock, thread or event loop. Everything that
//! touches the outside world goes through a [`Host`]: reading the time,
//! reporting pin writes, sleeping one slice of a blocking delay and pumping
//! host events between statements.
//!
//! Two hosts ship with the crate:
//! - [`SystemHost`]: wall clock and real sleeps, for headless runs
//! - [`VirtualHost`]: a manual clock that records every write, for tests
//!   and dry runs

use crate::board::PinLevel;
use std::thread;
use std::time::{Duration, Instant};

/// Request returned by the host at a cooperative yield point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostSignal {
    #[default]
    Continue,
    Pause,
    Stop,
}

/// Environment the interpreter runs in
pub trait Host {
    /// Monotonic milliseconds
    fn now_ms(&self) -> u64;

    /// Called after every successful `digitalWrite`, once the board holds the
    /// new level. `value` is the evaluated argument, before coercion to 0/1.
    fn digital_write(&mut self, pin: u8, value: i64);

    /// Event pump, called before each top-level loop statement and on every
    /// `for`/`while` iteration
    fn poll(&mut self) -> HostSignal {
        HostSignal::Continue
    }

    /// Block for one slice of a blocking delay
    fn sleep(&mut self, ms: u64) -> HostSignal;

    /// The session has no more work to do
    fn finished(&mut self) {}
}

/// Wall-clock host
#[derive(Debug)]
pub struct SystemHost {
    epoch: Instant,
    time_limit_ms: Option<u64>,
    writes: usize,
    finished: bool,
}

impl Default for SystemHost {
    fn default() -> Self {
        SystemHost {
            epoch: Instant::now(),
            time_limit_ms: None,
            writes: 0,
            finished: false,
        }
    }
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the interpreter to stop once `ms` have passed since creation
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    /// True once the time limit (if any) has passed
    pub fn expired(&self) -> bool {
        self.time_limit_ms
            .is_some_and(|limit| self.now_ms() >= limit)
    }

    fn signal(&self) -> HostSignal {
        if self.expired() {
            HostSignal::Stop
        } else {
            HostSignal::Continue
        }
    }
}

impl Host for SystemHost {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn digital_write(&mut self, pin: u8, value: i64) {
        self.writes += 1;
        let level = PinLevel::from_value(value);
        tracing::info!(pin, value, %level, at_ms = self.now_ms(), "digitalWrite");
    }

    fn poll(&mut self) -> HostSignal {
        self.signal()
    }

    fn sleep(&mut self, ms: u64) -> HostSignal {
        thread::sleep(Duration::from_millis(ms));
        self.signal()
    }

    fn finished(&mut self) {
        self.finished = true;
        tracing::debug!("session finished");
    }
}

/// A pin write observed by a [`VirtualHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEvent {
    pub at_ms: u64,
    pub pin: u8,
    pub value: i64,
}

impl WriteEvent {
    pub fn level(&self) -> PinLevel {
        PinLevel::from_value(self.value)
    }
}

/// Deterministic host with a manually advanced clock.
///
/// Time moves only through [`VirtualHost::advance`] and blocking delay slices.
/// Signals can be scripted with [`VirtualHost::signal_at`]; each one is
/// delivered once, at the first poll or sleep after the clock reaches it.
#[derive(Debug, Default)]
pub struct VirtualHost {
    clock_ms: u64,
    writes: Vec<WriteEvent>,
    scripted: Vec<(u64, HostSignal)>,
    finished_count: usize,
    slept_ms: u64,
}

impl VirtualHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.clock_ms = self.clock_ms.saturating_add(ms);
    }

    pub fn writes(&self) -> &[WriteEvent] {
        &self.writes
    }

    /// Writes as `(pin, value)` pairs, without timestamps
    pub fn write_pairs(&self) -> Vec<(u8, i64)> {
        self.writes
            .iter()
            .map(|write| (write.pin, write.value))
            .collect()
    }

    /// Number of `finished()` notifications received
    pub fn finished_count(&self) -> usize {
        self.finished_count
    }

    /// Total time spent in blocking delay slices
    pub fn slept_ms(&self) -> u64 {
        self.slept_ms
    }

    pub fn signal_at(&mut self, at_ms: u64, signal: HostSignal) {
        self.scripted.push((at_ms, signal));
    }

    fn take_signal(&mut self) -> HostSignal {
        let clock = self.clock_ms;
        match self.scripted.iter().position(|&(at, _)| at <= clock) {
            Some(index) => self.scripted.remove(index).1,
            None => HostSignal::Continue,
        }
    }
}

impl Host for VirtualHost {
    fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    fn digital_write(&mut self, pin: u8, value: i64) {
        self.writes.push(WriteEvent {
            at_ms: self.clock_ms,
            pin,
            value,
        });
    }

    fn poll(&mut self) -> HostSignal {
        self.take_signal()
    }

    fn sleep(&mut self, ms: u64) -> HostSignal {
        self.clock_ms = self.clock_ms.saturating_add(ms);
        self.slept_ms = self.slept_ms.saturating_add(ms);
        self.take_signal()
    }

    fn finished(&mut self) {
        self.finished_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_advances() {
        let mut host = VirtualHost::new();
        assert_eq!(host.now_ms(), 0);
        host.advance(250);
        assert_eq!(host.sleep(20), HostSignal::Continue);
        assert_eq!(host.now_ms(), 270);
        assert_eq!(host.slept_ms(), 20);
    }

    #[test]
    fn test_system_host_tracks_finish_and_limit() {
        let mut host = SystemHost::new().with_time_limit(0);
        assert!(!host.is_finished());
        assert!(host.expired());
        assert_eq!(host.poll(), HostSignal::Stop);
        host.digital_write(13, 1);
        assert_eq!(host.writes(), 1);
        host.finished();
        assert!(host.is_finished());
    }

    #[test]
    fn test_scripted_signal_delivered_once() {
        let mut host = VirtualHost::new();
        host.signal_at(100, HostSignal::Pause);
        assert_eq!(host.poll(), HostSignal::Continue);
        host.advance(100);
        assert_eq!(host.poll(), HostSignal::Pause);
        assert_eq!(host.poll(), HostSignal::Continue);
    }

    #[test]
    fn test_records_writes_with_time() {
        let mut host = VirtualHost::new();
        host.digital_write(13, 1);
        host.advance(1000);
        host.digital_write(13, 0);
        assert_eq!(
            host.writes(),
            &[
                WriteEvent {
                    at_ms: 0,
                    pin: 13,
                    value: 1
                },
                WriteEvent {
                    at_ms: 1000,
                    pin: 13,
                    value: 0
                },
            ]
        );
        assert_eq!(host.writes()[0].level(), PinLevel::High);
        assert_eq!(host.write_pairs(), vec![(13, 1), (13, 0)]);
    }

    #[test]
    fn test_system_host_time_limit() {
        let host = SystemHost::new().with_time_limit(0);
        assert!(host.expired());
        assert!(!SystemHost::new().expired());
    }
}
