//! Escaping of untrusted message text for display.
//!
//! Message content is stored raw and only passes through a [`Sanitizer`]
//! when the transcript is projected for a view.

use regex::Regex;
use std::sync::OnceLock;

/// Maps arbitrary text into a form that the target display treats as plain text.
pub trait Sanitizer {
    fn escape(&self, text: &str) -> String;
}

/// Escapes the characters HTML would interpret as markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEscaper;

impl Sanitizer for HtmlEscaper {
    fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }
}

/// Neutralizes terminal control sequences.
///
/// CSI/OSC escape sequences are dropped entirely; any other control
/// character except newline and tab becomes U+FFFD so it stays visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalEscaper;

const REPLACEMENT: char = '\u{FFFD}';

fn escape_sequence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?")
            .expect("escape sequence pattern is valid")
    })
}

impl Sanitizer for TerminalEscaper {
    fn escape(&self, text: &str) -> String {
        let stripped = escape_sequence_pattern().replace_all(text, "");
        stripped
            .chars()
            .map(|c| {
                if c.is_control() && c != '\n' && c != '\t' {
                    REPLACEMENT
                } else {
                    c
                }
            })
            .collect()
    }
}

/// Escape `text` for HTML display.
pub fn escape(text: &str) -> String {
    HtmlEscaper.escape(text)
}
