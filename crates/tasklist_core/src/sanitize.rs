//! One-way escaping of display-unsafe characters.
//!
//! # Invariants
//! - Escaping is a single pass over chars, equivalent to replacing `&` before
//!   the other four, so entities produced here are never re-escaped.
//! - Output is what gets stored; it is never unescaped on read.

const ESCAPES: &[(char, &str)] = &[
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
];

/// Trims `text` and escapes `& < > " '` to their entity equivalents.
pub fn sanitize(text: &str) -> String {
    let trimmed = text.trim();
    let mut escaped = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ESCAPES.iter().find(|(unsafe_char, _)| *unsafe_char == ch) {
            Some((_, entity)) => escaped.push_str(entity),
            None => escaped.push(ch),
        }
    }
    escaped
}
