//! Statement classification
//!
//! Every logical line of a sketch is classified exactly once into a
//! [`Statement`]. The executor then matches over the closed enum instead of
//! re-testing text patterns while it runs.
//!
//! # Trial order
//!
//! Several forms overlap (`int x = digitalRead(2);` is also a typed
//! declaration, which is also an assignment), so the first matching form wins:
//!
//! 1. blank lines and lone braces
//! 2. keyword headers: `} else ...`, `for`, `while`, `if`, `switch`, and the
//!    `case` / `default` / `break` markers of a switch body
//! 3. `pinMode`, `digitalWrite`, `delay`
//! 4. reads into a variable: `digitalRead`, then `millis`
//! 5. `x++`, `x--`, compound assignment (`+=`, `-=`, `*=`, `/=`, `%=`)
//! 6. typed declarations (with comma-separated declarators), bare assignment
//! 7. everything else is [`Statement::Ignored`]
//!
//! Keyword headers are tried first so that `if (c) x++;` stays conditional.
//! Expressions are kept as text and evaluated at run time, because their
//! variables change between passes.

use crate::board::PinMode;
use lazy_static::lazy_static;
use regex::Regex;

/// Type keywords accepted in declarations
const TYPE_PATTERN: &str = r"(?:unsigned\s+long|unsigned\s+int|unsigned\s+char|long\s+long|long|int|short|bool|boolean|byte|char|word|size_t|u?int(?:8|16|32|64)_t)";

lazy_static! {
    static ref PIN_MODE_RE: Regex =
        Regex::new(r"\bpinMode\s*\(\s*(.+?)\s*,\s*(OUTPUT|INPUT_PULLUP|INPUT)\s*\)").unwrap();
    static ref DIGITAL_WRITE_RE: Regex =
        Regex::new(r"\bdigitalWrite\s*\(\s*([^,]+?)\s*,\s*(.+)\)").unwrap();
    static ref DELAY_RE: Regex = Regex::new(r"\bdelay\s*\(\s*(.+)\)").unwrap();
    static ref READ_PIN_RE: Regex = Regex::new(&format!(
        r"^(?:const\s+)?(?:{TYPE_PATTERN}\s+)?(\w+)\s*=\s*digitalRead\s*\(\s*(.+?)\s*\)\s*;$"
    ))
    .unwrap();
    static ref READ_MILLIS_RE: Regex = Regex::new(&format!(
        r"^(?:const\s+)?(?:{TYPE_PATTERN}\s+)?(\w+)\s*=\s*millis\s*\(\s*\)\s*;$"
    ))
    .unwrap();
    static ref INCREMENT_RE: Regex = Regex::new(r"^(?:(\w+)\s*\+\+|\+\+\s*(\w+))\s*;$").unwrap();
    static ref DECREMENT_RE: Regex = Regex::new(r"^(?:(\w+)\s*--|--\s*(\w+))\s*;$").unwrap();
    static ref COMPOUND_RE: Regex = Regex::new(r"^(\w+)\s*([-+*/%])=\s*(.+?)\s*;$").unwrap();
    static ref DECLARE_RE: Regex = Regex::new(&format!(
        r"^(?:(?:const|static|volatile)\s+)*{TYPE_PATTERN}\s+(.+?)\s*;$"
    ))
    .unwrap();
    static ref ASSIGN_RE: Regex = Regex::new(r"^(\w+)\s*=\s*([^=].*?)\s*;$").unwrap();
    static ref DEFINE_RE: Regex = Regex::new(r"^#define\s+(\w+)\s+(.+)$").unwrap();
    static ref CASE_RE: Regex = Regex::new(r"^case\s+(.+?)\s*:").unwrap();
    static ref DEFAULT_RE: Regex = Regex::new(r"^default\s*:").unwrap();
    static ref BREAK_RE: Regex = Regex::new(r"^break\s*;").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_]\w*$").unwrap();
}

/// Operator of a compound assignment (`x op= expr`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl CompoundOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(CompoundOp::Add),
            "-" => Some(CompoundOp::Sub),
            "*" => Some(CompoundOp::Mul),
            "/" => Some(CompoundOp::Div),
            "%" => Some(CompoundOp::Rem),
            _ => None,
        }
    }

    /// Apply the operator. Division and remainder by zero yield 0.
    pub fn apply(self, current: i64, operand: i64) -> i64 {
        match self {
            CompoundOp::Add => current.wrapping_add(operand),
            CompoundOp::Sub => current.wrapping_sub(operand),
            CompoundOp::Mul => current.wrapping_mul(operand),
            CompoundOp::Div if operand == 0 => 0,
            CompoundOp::Div => current.wrapping_div(operand),
            CompoundOp::Rem if operand == 0 => 0,
            CompoundOp::Rem => current.wrapping_rem(operand),
        }
    }
}

/// One classified logical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Blank line or a brace-only line
    Empty,
    /// `for (init; condition; update) {`
    For {
        init: Option<Box<Statement>>,
        condition: String,
        update: Option<Box<Statement>>,
    },
    /// `while (condition) {`
    While { condition: String },
    /// `pinMode(pin, OUTPUT | INPUT | INPUT_PULLUP);`
    PinMode { pin: String, mode: PinMode },
    /// `digitalWrite(pin, value);`
    DigitalWrite { pin: String, value: String },
    /// `delay(ms);`
    Delay { duration: String },
    /// `[type] target = digitalRead(pin);`
    ReadPin { target: String, pin: String },
    /// `[type] target = millis();`
    ReadMillis { target: String },
    /// `target++;`
    Increment { target: String },
    /// `target--;`
    Decrement { target: String },
    /// `target op= expr;`
    CompoundAssign {
        target: String,
        op: CompoundOp,
        expr: String,
    },
    /// `if (condition) statement;`
    InlineIf {
        condition: String,
        body: Box<Statement>,
    },
    /// `[const] type a = 1, b = 2;` as `(name, initializer)` pairs
    Declare { bindings: Vec<(String, String)> },
    /// `target = expr;`
    Assign { target: String, expr: String },
    /// `switch (subject) {`
    Switch { subject: String },
    /// `if (condition) {`
    If { condition: String },
    /// `} else if (condition) {`
    ElseIf { condition: String },
    /// `} else {`
    Else,
    /// `case value:`
    Case { value: String },
    /// `default:`
    Default,
    /// `break;`
    Break,
    /// Anything the simulator does not model (`Serial.begin(9600);`, ...)
    Ignored,
}

impl Statement {
    /// True for the `else` / `else if` headers that continue an `if` chain
    pub fn is_else_header(&self) -> bool {
        matches!(self, Statement::ElseIf { .. } | Statement::Else)
    }
}

/// Drop a trailing `// comment`, ignoring `//` inside string literals
pub fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'/' && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            None => {}
        }
        i += 1;
    }
    line
}

/// True if `text` starts with `keyword` as a whole word
fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.strip_prefix(keyword).is_some_and(|rest| {
        !rest
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

/// Split `keyword (inner) rest` into `(inner, rest)`, matching parentheses
fn split_header<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let after = text.strip_prefix(keyword)?.trim_start();
    if !after.starts_with('(') {
        return None;
    }
    let mut depth = 0;
    for (i, c) in after.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((after[1..i].trim(), after[i + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `separator` at parenthesis depth 0
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// A body header is complete when its `{` is on the same line or the next one
fn opens_block(rest: &str) -> bool {
    rest.is_empty() || rest == "{"
}

/// Classify a `for (init; condition; update)` header
fn classify_for(line: &str) -> Option<Statement> {
    let (inner, rest) = split_header(line, "for")?;
    if !opens_block(rest) {
        return None;
    }
    let parts = split_top_level(inner, ';');
    if parts.len() != 3 {
        return None;
    }
    let clause = |text: &str| {
        let text = text.trim();
        (!text.is_empty()).then(|| Box::new(classify(&format!("{text};"))))
    };
    Some(Statement::For {
        init: clause(parts[0]),
        condition: parts[1].trim().to_string(),
        update: clause(parts[2]),
    })
}

/// Classify `if (c) {` and `if (c) statement;`
fn classify_if(line: &str) -> Option<Statement> {
    let (condition, rest) = split_header(line, "if")?;
    let condition = condition.to_string();
    if rest == "{" {
        return Some(Statement::If { condition });
    }
    if rest.ends_with(';') {
        return Some(Statement::InlineIf {
            condition,
            body: Box::new(classify(rest)),
        });
    }
    None
}

/// Classify the part of a line starting at `else`
fn classify_else(text: &str) -> Statement {
    let rest = text["else".len()..].trim_start();
    if rest == "{" {
        return Statement::Else;
    }
    if starts_with_keyword(rest, "if") {
        if let Some((condition, "{")) = split_header(rest, "if") {
            return Statement::ElseIf {
                condition: condition.to_string(),
            };
        }
    }
    Statement::Ignored
}

/// Parse the declarator list of a typed declaration: `a = 1, b, c = x + 2`
fn parse_declarators(list: &str) -> Vec<(String, String)> {
    split_top_level(list, ',')
        .into_iter()
        .filter_map(|declarator| {
            let declarator = declarator.trim();
            let (name, init) = match declarator.split_once('=') {
                Some((name, init)) => (name.trim(), init.trim()),
                None => (declarator, "0"),
            };
            IDENT_RE
                .is_match(name)
                .then(|| (name.to_string(), init.to_string()))
        })
        .collect()
}

/// Classify one logical line
pub fn classify(line: &str) -> Statement {
    let l = strip_line_comment(line).trim();
    if l.is_empty() || matches!(l, "{" | "}" | ";" | "};") {
        return Statement::Empty;
    }

    if let Some(rest) = l.strip_prefix('}') {
        let rest = rest.trim_start();
        if starts_with_keyword(rest, "else") {
            return classify_else(rest);
        }
    }
    if starts_with_keyword(l, "else") {
        return classify_else(l);
    }
    if starts_with_keyword(l, "for") {
        if let Some(statement) = classify_for(l) {
            return statement;
        }
    }
    if starts_with_keyword(l, "while") {
        if let Some((condition, rest)) = split_header(l, "while") {
            if opens_block(rest) {
                return Statement::While {
                    condition: condition.to_string(),
                };
            }
        }
    }
    if starts_with_keyword(l, "if") {
        if let Some(statement) = classify_if(l) {
            return statement;
        }
    }
    if starts_with_keyword(l, "switch") {
        if let Some((subject, "{")) = split_header(l, "switch") {
            return Statement::Switch {
                subject: subject.to_string(),
            };
        }
    }
    if let Some(caps) = CASE_RE.captures(l) {
        return Statement::Case {
            value: caps[1].to_string(),
        };
    }
    if DEFAULT_RE.is_match(l) {
        return Statement::Default;
    }
    if BREAK_RE.is_match(l) {
        return Statement::Break;
    }
    if l.starts_with("Serial.") {
        return Statement::Ignored;
    }

    if let Some(caps) = PIN_MODE_RE.captures(l) {
        let mode = if &caps[2] == "OUTPUT" {
            PinMode::Output
        } else {
            PinMode::Input
        };
        return Statement::PinMode {
            pin: caps[1].to_string(),
            mode,
        };
    }
    if let Some(caps) = DIGITAL_WRITE_RE.captures(l) {
        return Statement::DigitalWrite {
            pin: caps[1].trim().to_string(),
            value: caps[2].trim().to_string(),
        };
    }
    if let Some(caps) = DELAY_RE.captures(l) {
        return Statement::Delay {
            duration: caps[1].trim().to_string(),
        };
    }
    if let Some(caps) = READ_PIN_RE.captures(l) {
        return Statement::ReadPin {
            target: caps[1].to_string(),
            pin: caps[2].to_string(),
        };
    }
    if let Some(caps) = READ_MILLIS_RE.captures(l) {
        return Statement::ReadMillis {
            target: caps[1].to_string(),
        };
    }
    if let Some(caps) = INCREMENT_RE.captures(l) {
        if let Some(target) = caps.get(1).or_else(|| caps.get(2)) {
            return Statement::Increment {
                target: target.as_str().to_string(),
            };
        }
    }
    if let Some(caps) = DECREMENT_RE.captures(l) {
        if let Some(target) = caps.get(1).or_else(|| caps.get(2)) {
            return Statement::Decrement {
                target: target.as_str().to_string(),
            };
        }
    }
    if let Some(caps) = COMPOUND_RE.captures(l) {
        if let Some(op) = CompoundOp::from_symbol(&caps[2]) {
            return Statement::CompoundAssign {
                target: caps[1].to_string(),
                op,
                expr: caps[3].to_string(),
            };
        }
    }
    if let Some(caps) = DECLARE_RE.captures(l) {
        let bindings = parse_declarators(&caps[1]);
        if !bindings.is_empty() {
            return Statement::Declare { bindings };
        }
        return Statement::Ignored;
    }
    if let Some(caps) = ASSIGN_RE.captures(l) {
        return Statement::Assign {
            target: caps[1].to_string(),
            expr: caps[2].to_string(),
        };
    }
    if let Some(caps) = DEFINE_RE.captures(l) {
        return Statement::Declare {
            bindings: vec![(caps[1].to_string(), caps[2].trim().to_string())],
        };
    }

    Statement::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> String {
        text.to_string()
    }

    #[test]
    fn test_pin_calls() {
        assert_eq!(
            classify("pinMode(ledPin, OUTPUT);"),
            Statement::PinMode {
                pin: s("ledPin"),
                mode: PinMode::Output
            }
        );
        assert_eq!(
            classify("pinMode(2, INPUT_PULLUP);"),
            Statement::PinMode {
                pin: s("2"),
                mode: PinMode::Input
            }
        );
        assert_eq!(
            classify("digitalWrite(13, !digitalRead(13)); // toggle"),
            Statement::DigitalWrite {
                pin: s("13"),
                value: s("!digitalRead(13)")
            }
        );
        assert_eq!(
            classify("delay(interval * 2);"),
            Statement::Delay {
                duration: s("interval * 2")
            }
        );
    }

    #[test]
    fn test_reads_into_variables() {
        assert_eq!(
            classify("int state = digitalRead(buttonPin);"),
            Statement::ReadPin {
                target: s("state"),
                pin: s("buttonPin")
            }
        );
        assert_eq!(
            classify("state = digitalRead(2);"),
            Statement::ReadPin {
                target: s("state"),
                pin: s("2")
            }
        );
        assert_eq!(
            classify("unsigned long now = millis();"),
            Statement::ReadMillis { target: s("now") }
        );
        // Trailing arithmetic is a general declaration, not a bare read
        assert_eq!(
            classify("int x = digitalRead(2) + 1;"),
            Statement::Declare {
                bindings: vec![(s("x"), s("digitalRead(2) + 1"))]
            }
        );
    }

    #[test]
    fn test_increments_and_compound_assignment() {
        assert_eq!(classify("count++;"), Statement::Increment { target: s("count") });
        assert_eq!(classify("++count;"), Statement::Increment { target: s("count") });
        assert_eq!(classify("i--;"), Statement::Decrement { target: s("i") });
        assert_eq!(
            classify("total += step * 2;"),
            Statement::CompoundAssign {
                target: s("total"),
                op: CompoundOp::Add,
                expr: s("step * 2")
            }
        );
        assert_eq!(
            classify("x -= 1;"),
            Statement::CompoundAssign {
                target: s("x"),
                op: CompoundOp::Sub,
                expr: s("1")
            }
        );
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            classify("const int a = 1, b = 2;"),
            Statement::Declare {
                bindings: vec![(s("a"), s("1")), (s("b"), s("2"))]
            }
        );
        assert_eq!(
            classify("unsigned long last = 0;"),
            Statement::Declare {
                bindings: vec![(s("last"), s("0"))]
            }
        );
        assert_eq!(
            classify("int counter;"),
            Statement::Declare {
                bindings: vec![(s("counter"), s("0"))]
            }
        );
        assert_eq!(classify("int blink(int pin);"), Statement::Ignored);
        assert_eq!(
            classify("#define LED 13"),
            Statement::Declare {
                bindings: vec![(s("LED"), s("13"))]
            }
        );
    }

    #[test]
    fn test_assignment_is_not_comparison() {
        assert_eq!(
            classify("state = !state;"),
            Statement::Assign {
                target: s("state"),
                expr: s("!state")
            }
        );
        assert_eq!(classify("state == 1;"), Statement::Ignored);
    }

    #[test]
    fn test_control_flow_headers() {
        assert_eq!(
            classify("for (int i = 0; i < 3; i++) {"),
            Statement::For {
                init: Some(Box::new(Statement::Declare {
                    bindings: vec![(s("i"), s("0"))]
                })),
                condition: s("i < 3"),
                update: Some(Box::new(Statement::Increment { target: s("i") })),
            }
        );
        assert_eq!(
            classify("while (digitalRead(2) == HIGH) {"),
            Statement::While {
                condition: s("digitalRead(2) == HIGH")
            }
        );
        assert_eq!(
            classify("if ((a > 1) && b) {"),
            Statement::If {
                condition: s("(a > 1) && b")
            }
        );
        assert_eq!(
            classify("} else if (x == 2) {"),
            Statement::ElseIf {
                condition: s("x == 2")
            }
        );
        assert_eq!(classify("else {"), Statement::Else);
        assert_eq!(classify("} else {"), Statement::Else);
        assert_eq!(
            classify("switch (mode) {"),
            Statement::Switch { subject: s("mode") }
        );
        assert_eq!(classify("case 2:"), Statement::Case { value: s("2") });
        assert_eq!(classify("default:"), Statement::Default);
        assert_eq!(classify("break;"), Statement::Break);
    }

    #[test]
    fn test_inline_if_is_conditional() {
        assert_eq!(
            classify("if (x > 5) count++;"),
            Statement::InlineIf {
                condition: s("x > 5"),
                body: Box::new(Statement::Increment { target: s("count") }),
            }
        );
        assert_eq!(
            classify("if (digitalRead(2) == LOW) digitalWrite(13, HIGH);"),
            Statement::InlineIf {
                condition: s("digitalRead(2) == LOW"),
                body: Box::new(Statement::DigitalWrite {
                    pin: s("13"),
                    value: s("HIGH")
                }),
            }
        );
    }

    #[test]
    fn test_keywords_need_word_boundary() {
        assert_eq!(
            classify("format = 1;"),
            Statement::Assign {
                target: s("format"),
                expr: s("1")
            }
        );
        assert_eq!(
            classify("iffy = 2;"),
            Statement::Assign {
                target: s("iffy"),
                expr: s("2")
            }
        );
    }

    #[test]
    fn test_ignored_lines() {
        assert_eq!(classify(""), Statement::Empty);
        assert_eq!(classify("}"), Statement::Empty);
        assert_eq!(classify("// just a comment"), Statement::Empty);
        assert_eq!(classify("Serial.begin(9600);"), Statement::Ignored);
        assert_eq!(classify("analogWrite(9, 128);"), Statement::Ignored);
        assert_eq!(classify("tone(8, 440);"), Statement::Ignored);
    }

    #[test]
    fn test_compound_op_division_by_zero() {
        assert_eq!(CompoundOp::Div.apply(10, 0), 0);
        assert_eq!(CompoundOp::Rem.apply(10, 0), 0);
        assert_eq!(CompoundOp::Div.apply(10, 3), 3);
    }
}
