//! Loop statement execution (`for`, `while`).
//!
//! Adds `impl Interpreter` methods for the two loop forms. Loop bodies run in
//! [`Scope::Nested`], so a `delay()` inside them blocks in slices instead of
//! suspending the session. The host is polled once per iteration, which
//! gives stop and pause a chance to interrupt a loop that never ends on its
//! own.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::host::Host;
use crate::interpreter::statements::{Flow, Scope};
use crate::parser::blocks::find_matching_brace;
use crate::parser::source::SourceLine;
use crate::parser::statement::Statement;

/// Result of one pass through a loop body
enum LoopBodyResult {
    /// Body completed; iterate again
    Continue,
    /// `break` was reached
    Break,
    /// Interrupted by the host; unwind
    Exit,
}

impl<H: Host> Interpreter<H> {
    fn execute_loop_body(&mut self, lines: &[SourceLine], start: usize, end: usize) -> LoopBodyResult {
        match self.execute_block(lines, start, end, Scope::Nested) {
            Flow::Next(_) => LoopBodyResult::Continue,
            Flow::Break => LoopBodyResult::Break,
            Flow::Suspend | Flow::Interrupt => LoopBodyResult::Exit,
        }
    }

    /// Poll the host between iterations. Returns true if the loop must unwind.
    fn loop_interrupted(&mut self) -> bool {
        let signal = self.host.poll();
        self.interrupted_by(signal)
    }

    /// Executes `for (init; condition; update) { body }` whose header is at
    /// `index`. Returns the index after the closing brace.
    pub(crate) fn execute_for(
        &mut self,
        init: Option<&Statement>,
        condition: &str,
        update: Option<&Statement>,
        lines: &[SourceLine],
        index: usize,
    ) -> Flow {
        let body_start = index + 1;
        let close = find_matching_brace(lines, body_start);

        if let Some(init) = init {
            if self.execute_statement(init, lines, index, Scope::Nested) == Flow::Interrupt {
                return Flow::Interrupt;
            }
        }

        loop {
            if self.loop_interrupted() {
                return Flow::Interrupt;
            }
            // An empty condition loops forever, as in C
            if !condition.trim().is_empty() && !self.eval_condition(condition) {
                break;
            }

            match self.execute_loop_body(lines, body_start, close) {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit => return Flow::Interrupt,
            }

            if let Some(update) = update {
                if self.execute_statement(update, lines, index, Scope::Nested) == Flow::Interrupt {
                    return Flow::Interrupt;
                }
            }
        }

        Flow::Next((close + 1).min(lines.len()))
    }

    /// Executes `while (condition) { body }` whose header is at `index`
    pub(crate) fn execute_while(&mut self, condition: &str, lines: &[SourceLine], index: usize) -> Flow {
        let body_start = index + 1;
        let close = find_matching_brace(lines, body_start);

        loop {
            if self.loop_interrupted() {
                return Flow::Interrupt;
            }
            if !self.eval_condition(condition) {
                break;
            }

            match self.execute_loop_body(lines, body_start, close) {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit => return Flow::Interrupt,
            }
        }

        Flow::Next((close + 1).min(lines.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::{HostSignal, VirtualHost};
    use crate::parser::source::split_logical_lines;

    fn body(code: &str) -> Vec<SourceLine> {
        split_logical_lines(code, 1)
            .into_iter()
            .map(|(line_no, text)| SourceLine::new(line_no, text))
            .collect()
    }

    fn run(code: &str) -> Interpreter<VirtualHost> {
        let mut interp = Interpreter::new(VirtualHost::new());
        let lines = body(code);
        let flow = interp.execute_block(&lines, 0, lines.len(), Scope::Loop);
        assert_eq!(flow, Flow::Next(lines.len()));
        interp
    }

    #[test]
    fn test_for_writes_each_iteration() {
        let interp = run("pinMode(9, OUTPUT);\nfor (int i = 0; i < 3; i++) {\n  digitalWrite(9, i);\n}\ndone = 1;");
        assert_eq!(interp.host().write_pairs(), vec![(9, 0), (9, 1), (9, 2)]);
        assert_eq!(interp.variable("i"), Some(3));
        assert_eq!(interp.variable("done"), Some(1));
        assert_eq!(interp.board().get_digital_pin(9), 1);
    }

    #[test]
    fn test_while_counts_down() {
        let interp = run("n = 4;\nwhile (n > 0) {\n  n--;\n  total += 2;\n}");
        assert_eq!(interp.variable("n"), Some(0));
        assert_eq!(interp.variable("total"), Some(8));
    }

    #[test]
    fn test_break_exits_innermost_loop() {
        let interp = run(
            "for (i = 0; i < 10; i++) {\n  if (i == 4) {\n    break;\n  }\n  seen++;\n}\nafter = 1;",
        );
        assert_eq!(interp.variable("i"), Some(4));
        assert_eq!(interp.variable("seen"), Some(4));
        assert_eq!(interp.variable("after"), Some(1));
    }

    #[test]
    fn test_delay_in_loop_blocks() {
        let interp = run("for (i = 0; i < 3; i++) {\n  delay(30);\n}");
        assert_eq!(interp.host().now_ms(), 90);
        assert!(interp.wakeup.is_none());
    }

    #[test]
    fn test_stop_interrupts_endless_loop() {
        let mut interp = Interpreter::new(VirtualHost::new());
        interp.host_mut().signal_at(100, HostSignal::Stop);
        let lines = body("while (true) {\n  delay(10);\n}");
        assert_eq!(interp.execute_block(&lines, 0, lines.len(), Scope::Loop), Flow::Interrupt);
        assert_eq!(interp.host().now_ms(), 100);
    }
}
