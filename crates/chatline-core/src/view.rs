//! What a host UI reads from a session and what it may ask of it.

use crate::client::ChatRequest;
use crate::transcript::DisplayRecord;
use serde::Serialize;

/// Snapshot of every signal a host needs to draw the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub transcript: Vec<DisplayRecord>,
    pub input_text: String,
    pub input_cursor: usize,
    pub input_count: usize,
    /// `count/4000`
    pub count_label: String,
    pub submit_enabled: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub model: String,
    pub temperature: f64,
}

/// Named user actions a host wires to its own widgets and key bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    Edit(String),
    Submit,
    /// Dismiss the error surface.
    Acknowledge,
    TriggerClear,
    FocusInput,
    SelectModel(String),
    SetTemperature(f64),
}

/// Work the host must carry out after handling an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send this request and hand the outcome to
    /// [`SessionController::complete_submit`](crate::SessionController::complete_submit).
    SendChat(ChatRequest),
    /// The local transcript was reset; tell the endpoint too. Later
    /// `SendChat` requests go out only after this one completes.
    ClearRemote,
    FocusInput,
}
