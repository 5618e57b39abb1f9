//! Brace matching over logical lines
//!
//! Block bodies are never parsed into a tree. Every `if`, `else`, `for`,
//! `while` and `switch` body is carved out of the flat line list by index:
//! the header line owns the opening `{`, and the body runs until the line
//! holding the matching `}`.

/// Yields the `{` and `}` characters of a line that are not inside a string
/// or character literal.
fn braces(code: &str) -> impl Iterator<Item = char> + '_ {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    code.chars().filter(move |&c| {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            return false;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                false
            }
            '{' | '}' => true,
            _ => false,
        }
    })
}

/// Net change in brace depth across one line
pub fn brace_delta(code: &str) -> i32 {
    braces(code)
        .map(|c| if c == '{' { 1 } else { -1 })
        .sum()
}

/// Find the line holding the `}` that closes a block whose `{` has already
/// been consumed.
///
/// Scanning starts at `start` with depth 1. Returns the index of the line on
/// which the depth reaches 0, or `lines.len()` if the block is never closed
/// (or `start` is already past the end).
pub fn find_matching_brace<L: AsRef<str>>(lines: &[L], start: usize) -> usize {
    if start >= lines.len() {
        return lines.len();
    }

    let mut depth = 1;
    for (index, line) in lines.iter().enumerate().skip(start) {
        for brace in braces(line.as_ref()) {
            if brace == '{' {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    return index;
                }
            }
        }
    }
    lines.len()
}

/// Find the header line of the innermost block that contains line `index`.
///
/// Scans backwards from the line before `index` for a `{` that is still open
/// at `index`. Returns `None` when the line is at the outermost level.
pub fn enclosing_block_start<L: AsRef<str>>(lines: &[L], index: usize) -> Option<usize> {
    let mut depth = 0;
    for candidate in (0..index.min(lines.len())).rev() {
        let braces: Vec<char> = braces(lines[candidate].as_ref()).collect();
        for brace in braces.into_iter().rev() {
            if brace == '}' {
                depth += 1;
            } else if depth == 0 {
                return Some(candidate);
            } else {
                depth -= 1;
            }
        }
    }
    None
}
