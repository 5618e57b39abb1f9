//! Branch execution (`if` / `else if` / `else`, `switch`).
//!
//! Branch bodies inherit the caller's [`Scope`]: a `delay()` directly inside
//! an arm of `loop()` suspends the session just like one at the top of
//! `loop()`. The continuation then resumes in the middle of the arm, so the
//! flat body must also make sense when reached sequentially:
//! - an `else` header reached that way skips the rest of its chain
//! - a `case`/`default` label or `break` ends the arm (see
//!   [`Interpreter::break_target`])

use crate::interpreter::engine::Interpreter;
use crate::interpreter::host::Host;
use crate::interpreter::statements::{Flow, Scope};
use crate::parser::blocks::{brace_delta, find_matching_brace};
use crate::parser::source::SourceLine;
use crate::parser::statement::Statement;

/// The `else` header that continues a chain whose previous body closed at
/// `close`, if any. `} else ...` is one line after splitting, but a bare `}`
/// followed by an `else` line is accepted too.
fn next_else(lines: &[SourceLine], close: usize) -> Option<usize> {
    let closing = lines.get(close)?;
    if closing.statement.is_else_header() {
        return Some(close);
    }
    if closing.code.trim() == "}" {
        let following = lines.get(close + 1)?;
        if following.statement.is_else_header() && following.code.trim_start().starts_with("else") {
            return Some(close + 1);
        }
    }
    None
}

impl<H: Host> Interpreter<H> {
    /// Executes an `if` chain whose `if` header is at `index`.
    ///
    /// Conditions are tested in order and at most one body runs. Returns the
    /// index after the chain's last closing brace.
    pub(crate) fn execute_if_chain(&mut self, lines: &[SourceLine], index: usize, scope: Scope) -> Flow {
        let mut header = index;
        let mut taken = false;

        loop {
            let body_start = header + 1;
            let close = find_matching_brace(lines, body_start);

            if !taken {
                let matches = match &lines[header].statement {
                    Statement::If { condition } | Statement::ElseIf { condition } => {
                        self.eval_condition(condition)
                    }
                    Statement::Else => true,
                    _ => false,
                };
                if matches {
                    taken = true;
                    match self.execute_block(lines, body_start, close, scope) {
                        Flow::Next(_) => {}
                        other => return other,
                    }
                }
            }

            match next_else(lines, close) {
                Some(next) => header = next,
                None => return Flow::Next((close + 1).min(lines.len())),
            }
        }
    }

    /// An `else` header reached by sequential flow means the previous branch
    /// ran; skip to the end of the chain.
    pub(crate) fn skip_else_chain(&mut self, lines: &[SourceLine], index: usize) -> Flow {
        let mut header = index;
        loop {
            let close = find_matching_brace(lines, header + 1);
            match next_else(lines, close) {
                Some(next) => header = next,
                None => return Flow::Next((close + 1).min(lines.len())),
            }
        }
    }

    /// Executes `switch (subject) { ... }` whose header is at `index`.
    ///
    /// The subject is evaluated once. Execution starts after the first
    /// `case` whose value matches, or else after the first `default`, and
    /// runs until a `break`, the next label, or the closing brace. Labels
    /// written back to back (`case 1: case 2:`) form one arm.
    pub(crate) fn execute_switch(
        &mut self,
        subject: &str,
        lines: &[SourceLine],
        index: usize,
        scope: Scope,
    ) -> Flow {
        let value = self.eval_expr(subject);
        let body_start = index + 1;
        let close = find_matching_brace(lines, body_start);
        let after = Flow::Next((close + 1).min(lines.len()));

        let mut depth = 0;
        let mut matched = None;
        let mut default = None;
        for label in body_start..close {
            // Labels of nested switches belong to them
            if depth == 0 {
                match &lines[label].statement {
                    Statement::Case { value: case } => {
                        if self.eval_expr(case) == value {
                            matched = Some(label);
                            break;
                        }
                    }
                    Statement::Default if default.is_none() => default = Some(label),
                    _ => {}
                }
            }
            depth += brace_delta(&lines[label].code);
        }

        let Some(label) = matched.or(default) else {
            return after;
        };
        // Labels stacked directly below share the arm
        let mut start = label + 1;
        while start < close
            && matches!(lines[start].statement, Statement::Case { .. } | Statement::Default)
        {
            start += 1;
        }
        match self.execute_block(lines, start, close, scope) {
            Flow::Next(_) | Flow::Break => after,
            other => other,
        }
    }
}
