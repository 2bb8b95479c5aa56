//! Pending input owned by a session.
//!
//! Lengths are counted in `char`s and the cursor is a char index, so editing
//! stays UTF-8 safe.

use thiserror::Error;

/// Maximum length of a single message, shown to the user as `count/4000`.
pub const MAX_INPUT_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    #[error("message is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the pending text. Text over the limit is rejected and the
    /// current text is left as it was.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ComposerError> {
        let text = text.into();
        let len = text.chars().count();
        if len > MAX_INPUT_CHARS {
            return Err(ComposerError::TooLong {
                len,
                max: MAX_INPUT_CHARS,
            });
        }
        self.text = text;
        self.cursor = len;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.text.chars().count()
    }

    /// `count/4000` label for the input box.
    pub fn count_label(&self) -> String {
        format!("{}/{}", self.count(), MAX_INPUT_CHARS)
    }

    pub fn is_submittable(&self, sending: bool) -> bool {
        !sending && !self.text.trim().is_empty()
    }

    /// Take the trimmed text and clear the buffer.
    ///
    /// Returns `None` without touching the buffer when there is nothing but
    /// whitespace to send.
    pub fn consume(&mut self) -> Option<String> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let message = trimmed.to_string();
        self.clear();
        Some(message)
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Insert at the cursor. Returns `false` once the limit is reached.
    pub fn insert_char(&mut self, c: char) -> bool {
        if self.count() >= MAX_INPUT_CHARS {
            return false;
        }
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
        true
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.count();
    }
}
