//! Line execution
//!
//! Adds `impl Interpreter` methods that execute one classified line against
//! the variable store and the board. Block constructs are delegated to
//! [`loops`](super::loops) and [`branches`](super::branches).
//!
//! Lines are addressed by index into a flat body. Executing a line returns a
//! [`Flow`] telling the caller where to continue, instead of moving a shared
//! cursor.

use crate::board::PinMode;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::Warning;
use crate::interpreter::host::Host;
use crate::parser::blocks::{enclosing_block_start, find_matching_brace};
use crate::parser::source::SourceLine;
use crate::parser::statement::Statement;

/// Where execution continues after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Continue at this index
    Next(usize),
    /// A top-level delay was armed; unwind to the host
    Suspend,
    /// `break` (or a `case` label reached by falling through)
    Break,
    /// The host asked to stop or pause; unwind to the scheduler
    Interrupt,
}

/// Context a line is executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Setup,
    /// Directly in `loop()`, including `if`/`switch` arms
    Loop,
    /// Inside a `for`/`while` body
    Nested,
}

/// How a `delay()` waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelayMode {
    /// Arm a continuation and return to the host
    TopLevelDeferred,
    /// Sleep in slices, yielding to the host between them
    BlockingChunked,
}

impl Scope {
    pub(crate) fn delay_mode(self) -> DelayMode {
        match self {
            Scope::Loop => DelayMode::TopLevelDeferred,
            Scope::Setup | Scope::Nested => DelayMode::BlockingChunked,
        }
    }
}

impl<H: Host> Interpreter<H> {
    pub(crate) fn execute_line(&mut self, lines: &[SourceLine], index: usize, scope: Scope) -> Flow {
        self.execute_statement(&lines[index].statement, lines, index, scope)
    }

    /// Execute `statement`, which sits at `index` in `lines`
    pub(crate) fn execute_statement(
        &mut self,
        statement: &Statement,
        lines: &[SourceLine],
        index: usize,
        scope: Scope,
    ) -> Flow {
        let next = Flow::Next(index + 1);
        match statement {
            Statement::Empty | Statement::Ignored => next,

            Statement::For {
                init,
                condition,
                update,
            } => self.execute_for(init.as_deref(), condition, update.as_deref(), lines, index),
            Statement::While { condition } => self.execute_while(condition, lines, index),
            Statement::If { .. } => self.execute_if_chain(lines, index, scope),
            Statement::ElseIf { .. } | Statement::Else => self.skip_else_chain(lines, index),
            Statement::Switch { subject } => self.execute_switch(subject, lines, index, scope),
            Statement::Case { .. } | Statement::Default | Statement::Break => Flow::Break,

            Statement::InlineIf { condition, body } => {
                if self.eval_condition(condition) {
                    self.execute_statement(body, lines, index, scope)
                } else {
                    next
                }
            }

            Statement::PinMode { pin, mode } => {
                self.execute_pin_mode(pin, *mode);
                next
            }
            Statement::DigitalWrite { pin, value } => {
                self.execute_digital_write(pin, value);
                next
            }
            Statement::Delay { duration } => {
                let requested = self.eval_expr(duration);
                let ms = self.clamp_delay(requested);
                match scope.delay_mode() {
                    DelayMode::TopLevelDeferred => {
                        self.arm_delay(ms, index + 1);
                        Flow::Suspend
                    }
                    DelayMode::BlockingChunked => {
                        if self.block_for(ms) {
                            next
                        } else {
                            Flow::Interrupt
                        }
                    }
                }
            }

            Statement::ReadPin { target, pin } => {
                let pin = self.eval_expr(pin);
                // An invalid pin leaves the target untouched
                if let Some(pin) = self.checked_pin("digitalRead", pin) {
                    let value = self.board.get_digital_pin(pin as i64) as i64;
                    self.variables.insert(target.clone(), value);
                }
                next
            }
            Statement::ReadMillis { target } => {
                let elapsed = self.elapsed_ms() as i64;
                self.variables.insert(target.clone(), elapsed);
                next
            }
            Statement::Increment { target } => {
                let slot = self.variables.entry(target.clone()).or_insert(0);
                *slot = slot.wrapping_add(1);
                next
            }
            Statement::Decrement { target } => {
                let slot = self.variables.entry(target.clone()).or_insert(0);
                *slot = slot.wrapping_sub(1);
                next
            }
            Statement::CompoundAssign { target, op, expr } => {
                let operand = self.eval_expr(expr);
                let slot = self.variables.entry(target.clone()).or_insert(0);
                *slot = op.apply(*slot, operand);
                next
            }
            Statement::Declare { bindings } => {
                for (name, init) in bindings {
                    let value = self.eval_expr(init);
                    self.variables.insert(name.clone(), value);
                }
                next
            }
            Statement::Assign { target, expr } => {
                let value = self.eval_expr(expr);
                self.variables.insert(target.clone(), value);
                next
            }
        }
    }

    /// Run `lines[start..end]` in order
    pub(crate) fn execute_block(
        &mut self,
        lines: &[SourceLine],
        start: usize,
        end: usize,
        scope: Scope,
    ) -> Flow {
        let mut index = start;
        while index < end {
            match self.execute_line(lines, index, scope) {
                Flow::Next(next) => index = next,
                other => return other,
            }
        }
        Flow::Next(end)
    }

    /// Where a top-level `break` continues: past the closing brace of the
    /// innermost enclosing `switch` (or loop). A `break` outside any such
    /// block does nothing.
    pub(crate) fn break_target(&self, lines: &[SourceLine], index: usize) -> usize {
        let mut inner = index;
        while let Some(header) = enclosing_block_start(lines, inner) {
            if matches!(
                lines[header].statement,
                Statement::Switch { .. } | Statement::For { .. } | Statement::While { .. }
            ) {
                let close = find_matching_brace(lines, header + 1);
                return (close + 1).min(lines.len());
            }
            inner = header;
        }
        index + 1
    }

    /// Validate a pin number against the configured range
    fn checked_pin(&mut self, op: &'static str, pin: i64) -> Option<u8> {
        if (0..=self.config.max_pin as i64).contains(&pin) {
            Some(pin as u8)
        } else {
            self.warn(Warning::InvalidPin {
                op,
                pin,
                max: self.config.max_pin,
            });
            None
        }
    }

    /// `digitalRead`: invalid pins warn and read as 0
    pub(crate) fn read_pin(&mut self, pin: i64) -> i64 {
        match self.checked_pin("digitalRead", pin) {
            Some(pin) => self.board.get_digital_pin(pin as i64) as i64,
            None => 0,
        }
    }

    fn execute_pin_mode(&mut self, pin: &str, mode: PinMode) {
        let pin = self.eval_expr(pin);
        if let Some(pin) = self.checked_pin("pinMode", pin) {
            self.board.set_pin_mode(pin, mode);
        }
    }

    fn execute_digital_write(&mut self, pin: &str, value: &str) {
        let pin = self.eval_expr(pin);
        let Some(pin) = self.checked_pin("digitalWrite", pin) else {
            return;
        };
        let value = self.eval_expr(value);
        self.board.set_digital_pin(pin as i64, value);
        self.host.digital_write(pin, value);
    }

    /// Negative durations become 0; long ones are capped with a warning
    fn clamp_delay(&mut self, requested: i64) -> u64 {
        let max = self.config.max_delay_ms;
        if requested < 0 {
            0
        } else if requested as u64 > max {
            self.warn(Warning::DelayClamped { requested, max });
            max
        } else {
            requested as u64
        }
    }

    /// Sleep `ms` in host slices. Returns false if the host interrupted.
    fn block_for(&mut self, ms: u64) -> bool {
        let slice = self.config.delay_slice_ms.max(1);
        let mut remaining = ms;
        while remaining > 0 {
            let step = remaining.min(slice);
            let signal = self.host.sleep(step);
            remaining -= step;
            if self.interrupted_by(signal) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::VirtualHost;

    fn lines(code: &[&str]) -> Vec<SourceLine> {
        code.iter()
            .enumerate()
            .map(|(i, text)| SourceLine::new(i + 1, *text))
            .collect()
    }

    fn interpreter() -> Interpreter<VirtualHost> {
        Interpreter::new(VirtualHost::new())
    }

    #[test]
    fn test_assignments_mutate_store() {
        let mut interp = interpreter();
        let body = lines(&["int a = 2, b = a * 3;", "a += b;", "b--;", "c++;", "d = a % 5;"]);
        assert_eq!(interp.execute_block(&body, 0, body.len(), Scope::Nested), Flow::Next(5));
        assert_eq!(interp.variable("a"), Some(8));
        assert_eq!(interp.variable("b"), Some(5));
        assert_eq!(interp.variable("c"), Some(1));
        assert_eq!(interp.variable("d"), Some(3));
    }

    #[test]
    fn test_invalid_pin_warns() {
        let mut interp = interpreter();
        let body = lines(&["pinMode(25, OUTPUT);", "digitalWrite(-1, HIGH);"]);
        interp.execute_block(&body, 0, body.len(), Scope::Nested);
        assert!(interp.host().writes().is_empty());
        assert_eq!(
            interp.log().messages(),
            vec![
                "pinMode: invalid pin 25 (valid: 0-19)",
                "digitalWrite: invalid pin -1 (valid: 0-19)"
            ]
        );
    }

    #[test]
    fn test_delay_modes() {
        let mut interp = interpreter();
        let body = lines(&["delay(50);"]);
        assert_eq!(interp.execute_line(&body, 0, Scope::Nested), Flow::Next(1));
        assert_eq!(interp.host().now_ms(), 50);

        assert_eq!(interp.execute_line(&body, 0, Scope::Loop), Flow::Suspend);
        assert_eq!(interp.host().now_ms(), 50);
        assert_eq!(interp.wakeup.map(|w| (w.deadline_ms, w.resume_at)), Some((100, 1)));
    }

    #[test]
    fn test_delay_is_clamped() {
        let mut interp = interpreter();
        let body = lines(&["delay(90000);", "delay(-5);"]);
        interp.execute_block(&body, 0, body.len(), Scope::Setup);
        assert_eq!(interp.host().now_ms(), 60_000);
        assert_eq!(interp.log().messages(), vec!["delay(90000) capped to 60000 ms"]);
    }

    #[test]
    fn test_inline_if_body_only_runs_when_true() {
        let mut interp = interpreter();
        let body = lines(&["x = 3;", "if (x > 5) count++;", "if (x < 5) count += 10;"]);
        interp.execute_block(&body, 0, body.len(), Scope::Nested);
        assert_eq!(interp.variable("count"), Some(10));
    }

    #[test]
    fn test_break_target_skips_enclosing_switch() {
        let interp = interpreter();
        let body = lines(&[
            "switch (m) {",
            "case 1:",
            "if (x) {",
            "break;",
            "}",
            "y = 1;",
            "break;",
            "}",
            "z = 2;",
        ]);
        assert_eq!(interp.break_target(&body, 3), 8);
        assert_eq!(interp.break_target(&body, 2), 8);
        assert_eq!(interp.break_target(&body, 6), 8);
        assert_eq!(interp.break_target(&body, 8), 9);
    }
}
