//! Expression and condition evaluation
//!
//! Expressions are kept as text in the statement model and evaluated to
//! `i64` each time a line runs. Evaluation is total: anything that cannot be
//! understood evaluates to 0, division and remainder by zero give 0, and
//! arithmetic wraps.
//!
//! # Precedence
//!
//! An expression is split at the rightmost operator of the loosest family
//! found at parenthesis depth 0, then each side is evaluated recursively.
//! Families from loosest to tightest:
//!
//! | Family         | Operators      |
//! |----------------|----------------|
//! | bitwise or     | `\|`           |
//! | bitwise xor    | `^`            |
//! | additive       | `+` `-`        |
//! | multiplicative | `*` `/` `%`    |
//! | bitwise and    | `&`            |
//! | shift          | `>>` `<<`      |
//!
//! Prefix `!`, `-`, `~` bind tighter than every binary operator.
//!
//! Conditions split on the first top-level `&&`, then the first `||`, then
//! on a single comparison (`!=`, `==`, `>=`, `<=`, `>`, `<`, tried in that
//! order). Both sides of `&&`/`||` are always evaluated.

use crate::interpreter::constants::{ANALOG_PIN_BASE, LED_BUILTIN};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::host::Host;

/// Binary operator families, loosest first
const BINARY_FAMILIES: &[&[&str]] = &[
    &["|"],
    &["^"],
    &["+", "-"],
    &["*", "/", "%"],
    &["&"],
    &[">>", "<<"],
];

/// Comparison operators in trial order
const COMPARISONS: &[&str] = &["!=", "==", ">=", "<=", ">", "<"];

/// Remove one pair of parentheses that encloses the whole text
fn strip_outer_parens(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    // "(a) + (b)": the first ')' closes the opening '('
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then(|| inner.trim())
}

/// Byte offsets of characters at parenthesis depth 0, outside literals
fn top_level_offsets(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut offsets = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 => offsets.push(i),
            _ => {}
        }
        i += 1;
    }
    offsets
}

/// Can the text before `at` end an operand (so an operator at `at` is binary)?
fn has_left_operand(bytes: &[u8], at: usize) -> bool {
    bytes[..at]
        .iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b')' | b'\'' | b'"'))
}

/// Is `op` at `at` a binary operator rather than part of a longer token?
fn is_binary_at(bytes: &[u8], at: usize, op: &str) -> bool {
    let before = at.checked_sub(1).map(|i| bytes[i]);
    let after = bytes.get(at + op.len()).copied();
    let doubled = match op {
        "&" => before == Some(b'&') || after == Some(b'&'),
        "|" => before == Some(b'|') || after == Some(b'|'),
        "+" => before == Some(b'+') || after == Some(b'+'),
        "-" => before == Some(b'-') || after == Some(b'-') || after == Some(b'>'),
        ">>" => before == Some(b'>') || after == Some(b'>'),
        "<<" => before == Some(b'<') || after == Some(b'<'),
        _ => false,
    };
    !doubled && after != Some(b'=') && has_left_operand(bytes, at)
}

/// Rightmost top-level binary operator from `family`
fn find_binary(text: &str, family: &[&'static str]) -> Option<(usize, &'static str)> {
    let bytes = text.as_bytes();
    top_level_offsets(text).into_iter().rev().find_map(|at| {
        family
            .iter()
            .find(|op| bytes[at..].starts_with(op.as_bytes()) && is_binary_at(bytes, at, op))
            .map(|op| (at, *op))
    })
}

/// First top-level occurrence of `&&` or `||`
fn find_logical(text: &str, op: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    top_level_offsets(text)
        .into_iter()
        .find(|&at| bytes[at..].starts_with(op.as_bytes()))
}

/// First top-level occurrence of comparison `op`, not part of a shift or a
/// longer comparison
fn find_comparison(text: &str, op: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    top_level_offsets(text).into_iter().find(|&at| {
        if !bytes[at..].starts_with(op.as_bytes()) {
            return false;
        }
        let before = at.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(at + op.len()).copied();
        match op {
            ">=" => before != Some(b'>'),
            "<=" => before != Some(b'<'),
            ">" => {
                !matches!(before, Some(b'>' | b'-'))
                    && !matches!(after, Some(b'>' | b'='))
            }
            "<" => before != Some(b'<') && !matches!(after, Some(b'<' | b'=')),
            _ => true,
        }
    })
}

fn apply_binary(op: &str, lhs: i64, rhs: i64) -> i64 {
    match op {
        "+" => lhs.wrapping_add(rhs),
        "-" => lhs.wrapping_sub(rhs),
        "*" => lhs.wrapping_mul(rhs),
        "/" if rhs == 0 => 0,
        "/" => lhs.wrapping_div(rhs),
        "%" if rhs == 0 => 0,
        "%" => lhs.wrapping_rem(rhs),
        "&" => lhs & rhs,
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        ">>" | "<<" if !(0..=63).contains(&rhs) => 0,
        ">>" => lhs >> rhs,
        "<<" => lhs.wrapping_shl(rhs as u32),
        _ => 0,
    }
}

/// Names the simulator defines on its own
fn named_constant(name: &str) -> Option<i64> {
    let value = match name {
        "HIGH" | "true" | "OUTPUT" => 1,
        "LOW" | "false" | "INPUT" => 0,
        "INPUT_PULLUP" => 2,
        "LED_BUILTIN" => LED_BUILTIN,
        _ => {
            let index = name.strip_prefix('A')?.parse::<i64>().ok()?;
            if !(0..=5).contains(&index) {
                return None;
            }
            ANALOG_PIN_BASE + index
        }
    };
    Some(value)
}

fn parse_char_literal(text: &str) -> Option<i64> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let value = match inner {
        "\\n" => '\n',
        "\\r" => '\r',
        "\\t" => '\t',
        "\\0" => '\0',
        "\\\\" => '\\',
        "\\'" => '\'',
        _ => {
            let mut chars = inner.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            c
        }
    };
    Some(value as i64)
}

/// Integer literal: decimal, `0x` hex, `0b` binary, optional `U`/`L` suffixes
pub(crate) fn parse_literal(text: &str) -> Option<i64> {
    if text.starts_with('\'') {
        return parse_char_literal(text);
    }
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex.trim_end_matches(['u', 'l']), 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin.trim_end_matches(['u', 'l']), 2)
    } else {
        (lower.trim_end_matches(['u', 'l']), 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().map(|v| v as i64)
}

/// Argument text of `name(arg)` when the call spans the whole text
fn call_argument<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then(|| inner.trim())
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl<H: Host> Interpreter<H> {
    /// Evaluate an integer expression
    pub fn eval_expr(&mut self, expr: &str) -> i64 {
        let e = expr.trim();
        if e.is_empty() {
            return 0;
        }
        if let Some(inner) = strip_outer_parens(e) {
            return self.eval_expr(inner);
        }

        // A leading `!` negates everything after it
        if let Some(rest) = e.strip_prefix('!') {
            return (self.eval_expr(rest) == 0) as i64;
        }

        for family in BINARY_FAMILIES {
            if let Some((at, op)) = find_binary(e, family) {
                let lhs = self.eval_expr(&e[..at]);
                let rhs = self.eval_expr(&e[at + op.len()..]);
                return apply_binary(op, lhs, rhs);
            }
        }

        if let Some(rest) = e.strip_prefix('-') {
            return self.eval_expr(rest).wrapping_neg();
        }
        if let Some(rest) = e.strip_prefix('~') {
            return !self.eval_expr(rest);
        }
        if let Some(rest) = e.strip_prefix('+') {
            return self.eval_expr(rest);
        }

        self.eval_atom(e)
    }

    /// Literals, names and the built-in calls
    fn eval_atom(&mut self, atom: &str) -> i64 {
        if let Some(value) = named_constant(atom) {
            return value;
        }
        if let Some(value) = self.variables.get(atom) {
            return *value;
        }
        if let Some(value) = parse_literal(atom) {
            return value;
        }
        if let Some(pin) = call_argument(atom, "digitalRead") {
            let pin = self.eval_expr(pin);
            return self.read_pin(pin);
        }
        if call_argument(atom, "millis").is_some_and(str::is_empty) {
            return self.elapsed_ms() as i64;
        }
        if !is_identifier(atom) {
            tracing::debug!(expr = atom, "unsupported expression evaluates to 0");
        }
        0
    }

    /// Evaluate a condition
    pub fn eval_condition(&mut self, cond: &str) -> bool {
        let c = cond.trim();
        if c.is_empty() {
            return false;
        }
        if let Some(inner) = strip_outer_parens(c) {
            return self.eval_condition(inner);
        }

        if let Some(at) = find_logical(c, "&&") {
            let lhs = self.eval_condition(&c[..at]);
            let rhs = self.eval_condition(&c[at + 2..]);
            return lhs && rhs;
        }
        if let Some(at) = find_logical(c, "||") {
            let lhs = self.eval_condition(&c[..at]);
            let rhs = self.eval_condition(&c[at + 2..]);
            return lhs || rhs;
        }

        for op in COMPARISONS {
            if let Some(at) = find_comparison(c, op) {
                let lhs = self.eval_expr(&c[..at]);
                let rhs = self.eval_expr(&c[at + op.len()..]);
                return match *op {
                    "!=" => lhs != rhs,
                    "==" => lhs == rhs,
                    ">=" => lhs >= rhs,
                    "<=" => lhs <= rhs,
                    ">" => lhs > rhs,
                    _ => lhs < rhs,
                };
            }
        }

        if let Some(rest) = c.strip_prefix('!') {
            return !self.eval_condition(rest);
        }
        self.eval_expr(c) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::PinMode;
    use crate::interpreter::host::VirtualHost;

    fn interpreter() -> Interpreter<VirtualHost> {
        Interpreter::new(VirtualHost::new())
    }

    fn eval(expr: &str) -> i64 {
        interpreter().eval_expr(expr)
    }

    fn cond(text: &str) -> bool {
        interpreter().eval_condition(text)
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(eval("2 + 3 * 4"), 14);
        assert_eq!(eval("(2 + 3) * 4"), 20);
        assert_eq!(eval("(2+3)*4"), 20);
        assert_eq!(eval("10 - 4 - 3"), 3);
        assert_eq!(eval("100 / 10 / 5"), 2);
        assert_eq!(eval("(1 + 2) * (3 + 4)"), 21);
        assert_eq!(eval("((7))"), 7);
    }

    #[test]
    fn test_division_by_zero_and_shifts() {
        assert_eq!(eval("7 / 0"), 0);
        assert_eq!(eval("7 % 0"), 0);
        assert_eq!(eval("8 >> 65"), 0);
        assert_eq!(eval("8 >> -1"), 0);
        assert_eq!(eval("8 >> 2"), 2);
        assert_eq!(eval("1 << 4"), 16);
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(eval("(5 >> 2) & 1"), 1);
        assert_eq!(eval("6 & 3"), 2);
        assert_eq!(eval("4 | 1"), 5);
        assert_eq!(eval("6 ^ 3"), 5);
        assert_eq!(eval("~0"), -1);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-5"), -5);
        assert_eq!(eval("2 * -3"), -6);
        assert_eq!(eval("10 - -2"), 12);
        assert_eq!(eval("-(2 + 3)"), -5);
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("0x1F"), 31);
        assert_eq!(eval("0b101"), 5);
        assert_eq!(eval("1000UL"), 1000);
        assert_eq!(eval("'A'"), 65);
        assert_eq!(eval("HIGH"), 1);
        assert_eq!(eval("LOW"), 0);
        assert_eq!(eval("true"), 1);
        assert_eq!(eval("LED_BUILTIN"), 13);
        assert_eq!(eval("A0"), 14);
        assert_eq!(eval("A5"), 19);
        assert_eq!(eval("A6"), 0);
    }

    #[test]
    fn test_unknown_text_is_zero() {
        assert_eq!(eval("analogRead(A0)"), 0);
        assert_eq!(eval("undefined_name"), 0);
        assert_eq!(eval(""), 0);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(eval("9223372036854775807 + 1"), i64::MIN);
        assert_eq!(eval("0xFFFFFFFFFFFFFFFF"), -1);
    }

    #[test]
    fn test_variables_and_negation() {
        let mut interp = interpreter();
        interp.variables.insert("count".into(), 6);
        interp.variables.insert("state".into(), 0);
        assert_eq!(interp.eval_expr("(count >> 1) & 1"), 1);
        assert_eq!(interp.eval_expr("count % 4 + 1"), 3);
        assert_eq!(interp.eval_expr("!state"), 1);
        assert_eq!(interp.eval_expr("!count"), 0);
    }

    #[test]
    fn test_leading_bang_negates_whole_expression() {
        let mut interp = interpreter();
        interp.variables.insert("a".into(), 0);
        assert_eq!(interp.eval_expr("!0 + 1"), 0);
        assert_eq!(interp.eval_expr("!a * 5"), 0);
        assert_eq!(interp.eval_expr("!a - 1"), 0);
        assert_eq!(interp.eval_expr("!(a + 1) + 1"), 0);
        assert_eq!(interp.eval_expr("-2 * 3"), -6);
    }

    #[test]
    fn test_builtin_calls() {
        let mut interp = interpreter();
        interp.board_mut().set_input_source(Box::new(|pin| (pin == 2) as u8));
        interp.board_mut().set_pin_mode(13, PinMode::Output);
        interp.board_mut().set_digital_pin(13, 1);
        interp.host_mut().advance(1500);
        interp.variables.insert("last".into(), 500);

        assert_eq!(interp.eval_expr("digitalRead(2)"), 1);
        assert_eq!(interp.eval_expr("digitalRead(3)"), 0);
        assert_eq!(interp.eval_expr("!digitalRead(13)"), 0);
        assert_eq!(interp.eval_expr("digitalRead(1 + 1) + 10"), 11);
        assert_eq!(interp.eval_expr("millis()"), 1500);
        assert_eq!(interp.eval_expr("(millis() - last)"), 1000);
    }

    #[test]
    fn test_digital_read_invalid_pin_warns() {
        let mut interp = interpreter();
        assert_eq!(interp.eval_expr("digitalRead(99)"), 0);
        assert_eq!(
            interp.log().messages(),
            vec!["digitalRead: invalid pin 99 (valid: 0-19)"]
        );
    }

    #[test]
    fn test_conditions() {
        assert!(cond("5 == 5 && 3 > 2"));
        assert!(cond("1 != 1 || 0 < 1"));
        assert!(!cond("1 != 1 || 2 < 1"));
        assert!(cond("4 >= 4"));
        assert!(cond("3 <= 4"));
        assert!(!cond("3 > 4"));
        assert!(cond("(1 < 2) && (2 < 3)"));
        assert!(cond("!(1 > 2)"));
        assert!(cond("7"));
        assert!(!cond("0"));
        assert!(!cond(""));
        assert!(cond("(8 >> 1) == 4"));
        assert!(cond("1 << 2 == 4"));
    }

    #[test]
    fn test_condition_operands_are_expressions() {
        let mut interp = interpreter();
        interp.variables.insert("now".into(), 1200);
        interp.variables.insert("last".into(), 100);
        interp.variables.insert("interval".into(), 1000);
        assert!(interp.eval_condition("now - last >= interval"));
        assert!(interp.eval_condition("digitalRead(2) == LOW"));
    }

    #[test]
    fn test_logical_operands_both_evaluated() {
        let mut interp = interpreter();
        assert!(!interp.eval_condition("0 && digitalRead(50)"));
        assert!(interp.eval_condition("1 || digitalRead(60)"));
        assert_eq!(interp.log().len(), 2);
    }
}
