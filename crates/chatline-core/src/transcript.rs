use crate::message::{Message, Role};
use crate::sanitize::{HtmlEscaper, Sanitizer};
use serde::Serialize;

/// Display format for message timestamps, e.g. `09:05 PM`.
pub const TIMESTAMP_FORMAT: &str = "%I:%M %p";

/// One transcript entry projected for a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub role: Role,
    pub escaped_content: String,
    pub formatted_timestamp: String,
}

/// Ordered log of exchanged messages.
///
/// Only ever appended to, except through [`Transcript::reset`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript seeded with a welcome entry.
    pub fn with_welcome(welcome: Message) -> Self {
        Self {
            messages: vec![welcome],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the whole contents with nothing or the single preserved entry.
    pub fn reset(&mut self, preserve: Option<Message>) {
        self.messages = preserve.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Project every message for HTML display.
    pub fn render(&self) -> impl Iterator<Item = DisplayRecord> + '_ {
        self.render_with(HtmlEscaper)
    }

    /// Project every message, escaping content with `sanitizer`.
    ///
    /// Borrowing projection: calling it again yields the same records.
    pub fn render_with<'a, S>(&'a self, sanitizer: S) -> impl Iterator<Item = DisplayRecord> + 'a
    where
        S: Sanitizer + 'a,
    {
        self.messages.iter().map(move |msg| DisplayRecord {
            role: msg.role(),
            escaped_content: sanitizer.escape(msg.content()),
            formatted_timestamp: msg.timestamp().format(TIMESTAMP_FORMAT).to_string(),
        })
    }
}
