//! Sketch source handling
//!
//! Turns raw sketch text into the flat line lists the interpreter walks:
//! comments are removed, the `setup()` and `loop()` bodies are located, and
//! each body is split into logical lines that are classified once.

use super::statement::{classify, Statement};
use crate::interpreter::errors::SketchError;
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref SETUP_RE: Regex = Regex::new(r"\bvoid\s+setup\s*\(\s*\)\s*\{").unwrap();
    static ref LOOP_RE: Regex = Regex::new(r"\bvoid\s+loop\s*\(\s*\)\s*\{").unwrap();
}

/// One logical line of a sketch body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line in the original sketch where this logical line starts
    pub line_no: usize,
    pub code: String,
    pub statement: Statement,
}

impl SourceLine {
    pub fn new(line_no: usize, code: impl Into<String>) -> Self {
        let code = code.into();
        let statement = classify(&code);
        SourceLine {
            line_no,
            code,
            statement,
        }
    }
}

impl AsRef<str> for SourceLine {
    fn as_ref(&self) -> &str {
        &self.code
    }
}

/// A parsed sketch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sketch {
    pub setup: Vec<SourceLine>,
    pub loop_body: Vec<SourceLine>,
    /// Top-level declarations (globals and `#define`s), in source order
    pub globals: Vec<SourceLine>,
}

/// Blank out `//` and `/* */` comments.
///
/// Every comment byte except newlines becomes a space, so byte offsets and
/// line numbers still match the original text. Comment markers inside string
/// and character literals are left alone.
pub fn strip_comments(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                out.push(' ');
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                    blank(&mut out, skipped);
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push_str("  ");
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    blank(&mut out, skipped);
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            ('"' | '\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    }
}

/// Byte offset of the `}` closing a block whose body starts at `start`.
/// Returns `None` if the block is never closed.
fn block_end(code: &str, start: usize) -> Option<usize> {
    let mut depth = 1;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in code[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Locate a function body by its header pattern.
/// Returns the body text (between the braces) and the line its `{` is on.
fn extract_body(code: &str, header: &Regex) -> Option<(Range<usize>, usize)> {
    let found = header.find(code)?;
    let start = found.end();
    let end = block_end(code, start).unwrap_or(code.len());
    let line_no = code[..start].matches('\n').count() + 1;
    Some((start..end, line_no))
}

/// Does the text after a `}` continue with an `else`?
fn continues_with_else(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.strip_prefix("else").is_some_and(|after| {
        !after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

/// Accumulates characters into logical lines
struct LineSplitter {
    lines: Vec<(usize, String)>,
    buffer: String,
    start_line: usize,
    line: usize,
}

impl LineSplitter {
    fn push(&mut self, c: char) {
        if self.buffer.trim().is_empty() {
            if c.is_whitespace() {
                return;
            }
            self.buffer.clear();
            self.start_line = self.line;
        }
        self.buffer.push(c);
    }

    fn flush(&mut self) {
        let text = self.buffer.trim();
        if !text.is_empty() {
            self.lines.push((self.start_line, text.to_string()));
        }
        self.buffer.clear();
    }

    fn is_preprocessor(&self) -> bool {
        self.buffer.trim_start().starts_with('#')
    }

    fn is_label(&self) -> bool {
        let text = self.buffer.trim_start();
        text.starts_with("case ") || text.starts_with("case(") || text.trim_end() == "default"
    }
}

/// Split a block of code into logical lines.
///
/// A logical line ends after a top-level `;`, after a `{`, after a `case` or
/// `default` label, and around a `}` (a `}` followed by `else` stays on the
/// `else` line). Physical newlines otherwise join, so a statement spread over
/// several lines becomes one logical line. Preprocessor lines end at their
/// newline. Each result is paired with the 1-based line it starts on, counting
/// from `first_line`.
pub fn split_logical_lines(code: &str, first_line: usize) -> Vec<(usize, String)> {
    let mut splitter = LineSplitter {
        lines: Vec::new(),
        buffer: String::new(),
        start_line: first_line,
        line: first_line,
    };
    let mut paren_depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in code.char_indices() {
        if let Some(q) = quote {
            splitter.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c == '\n' {
            if splitter.is_preprocessor() {
                splitter.flush();
            } else {
                splitter.push(' ');
            }
            splitter.line += 1;
            continue;
        }
        if splitter.is_preprocessor() {
            splitter.push(c);
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                splitter.push(c);
            }
            '(' => {
                paren_depth += 1;
                splitter.push(c);
            }
            ')' => {
                paren_depth = (paren_depth - 1).max(0);
                splitter.push(c);
            }
            ';' if paren_depth == 0 => {
                splitter.push(c);
                splitter.flush();
            }
            '{' => {
                splitter.push(c);
                splitter.flush();
            }
            '}' => {
                splitter.flush();
                splitter.push(c);
                if !continues_with_else(&code[offset + 1..]) {
                    splitter.flush();
                }
            }
            ':' if paren_depth == 0
                && splitter.is_label()
                && !code[offset + 1..].starts_with(':') =>
            {
                splitter.push(c);
                splitter.flush();
            }
            _ => splitter.push(c),
        }
    }
    splitter.flush();
    splitter.lines
}

fn to_source_lines(code: &str, first_line: usize) -> Vec<SourceLine> {
    split_logical_lines(code, first_line)
        .into_iter()
        .map(|(line_no, code)| SourceLine::new(line_no, code))
        .collect()
}

/// Lines of one entry-point body. A body holding nothing but comments keeps
/// its first comment as a no-op line, so it still counts as having work.
fn body_lines(stripped: &str, raw: &str, body: Range<usize>, first_line: usize) -> Vec<SourceLine> {
    let lines = to_source_lines(&stripped[body.clone()], first_line);
    if !lines.is_empty() {
        return lines;
    }
    let raw_body = raw.get(body).unwrap_or_default();
    raw_body
        .lines()
        .enumerate()
        .find(|(_, text)| !text.trim().is_empty())
        .map(|(offset, text)| SourceLine {
            line_no: first_line + offset,
            code: text.trim().to_string(),
            statement: Statement::Empty,
        })
        .into_iter()
        .collect()
}

/// Declarations at brace depth 0, outside every function body, including
/// ones initialized from `millis()` or `digitalRead()`
fn scan_globals(code: &str) -> Vec<SourceLine> {
    let mut depth = 0;
    let mut globals = Vec::new();
    for line in to_source_lines(code, 1) {
        let initializer = matches!(
            line.statement,
            Statement::Declare { .. } | Statement::ReadMillis { .. } | Statement::ReadPin { .. }
        );
        if depth == 0 && initializer {
            globals.push(line.clone());
        }
        depth += super::blocks::brace_delta(&line.code);
    }
    globals
}

/// Parse a sketch into its `setup()` body, `loop()` body and globals.
///
/// A sketch is accepted when at least one of `void setup() {` and
/// `void loop() {` is present; an empty body counts as present.
pub fn parse_sketch(raw: &str) -> Result<Sketch, SketchError> {
    let code = strip_comments(raw);
    let setup = extract_body(&code, &SETUP_RE);
    let loop_body = extract_body(&code, &LOOP_RE);

    if setup.is_none() && loop_body.is_none() {
        return Err(SketchError::MissingEntryPoints);
    }

    Ok(Sketch {
        setup: setup
            .map(|(body, line)| body_lines(&code, raw, body, line))
            .unwrap_or_default(),
        loop_body: loop_body
            .map(|(body, line)| body_lines(&code, raw, body, line))
            .unwrap_or_default(),
        globals: scan_globals(&code),
    })
}
