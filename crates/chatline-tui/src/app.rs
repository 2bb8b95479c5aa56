use std::sync::Arc;

use anyhow::Result;
use chatline_core::{
    clear_remote, ChatReply, ClearRejected, ClientError, Config, Effect, HttpChatClient,
    IntentError, ModelInfo, RemoteChatClient, SessionController, SessionView, SubmitRejected,
    TerminalEscaper, UserIntent,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::tui::AppEvent;

/// Amount `+`/`-` move the temperature by.
pub const TEMPERATURE_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub session: SessionController,
    client: Arc<HttpChatClient>,
    events: UnboundedSender<AppEvent>,
    /// Remote clear still in flight; the next chat request waits for it.
    pending_clear: Option<JoinHandle<()>>,

    // Transcript pane
    pub transcript_scroll: u16,
    pub transcript_height: u16, // Inner height of the transcript pane for scroll calculations
    pub transcript_width: u16,  // Inner width of the transcript pane for wrap calculations
    pub transcript_area: Option<Rect>,
    pub animation_frame: u8,

    // Model picker
    pub show_model_picker: bool,
    pub models_loading: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    /// One-line notice in the footer (cleared on the next key).
    pub notice: Option<String>,
    pub endpoint: String,
}

impl App {
    pub fn new(config: &Config, events: UnboundedSender<AppEvent>) -> Result<Self> {
        let client = HttpChatClient::with_timeout(config.endpoint(), config.timeout())?;
        let session =
            SessionController::with_welcome(config.chat_settings(), config.welcome_message());

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session,
            client: Arc::new(client),
            events,
            pending_clear: None,

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            transcript_area: None,
            animation_frame: 0,

            show_model_picker: false,
            models_loading: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            notice: None,
            endpoint: config.endpoint().to_string(),
        })
    }

    /// Signals for the renderer, with content made safe for the terminal.
    pub fn view(&self) -> SessionView {
        self.session.view_with(TerminalEscaper)
    }

    /// Route a user intent through the session and carry out the resulting effect.
    pub fn dispatch(&mut self, intent: UserIntent) {
        match self.session.handle(intent) {
            Ok(Some(effect)) => self.run_effect(effect),
            Ok(None) => {}
            Err(IntentError::Submit(SubmitRejected::Empty)) => {}
            Err(IntentError::Submit(SubmitRejected::ErrorPending))
            | Err(IntentError::Clear(ClearRejected::ErrorPending)) => {
                // The error popup is already on screen.
            }
            Err(err) => {
                tracing::debug!(error = %err, "intent rejected");
                self.notice = Some(err.to_string());
            }
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::SendChat(request) => {
                self.scroll_transcript_to_bottom();
                let client = Arc::clone(&self.client);
                let tx = self.events.clone();
                let pending_clear = self.pending_clear.take();
                tokio::spawn(async move {
                    if let Some(clear) = pending_clear {
                        let _ = clear.await;
                    }
                    let outcome = client.send_chat(&request).await;
                    let _ = tx.send(AppEvent::ChatFinished(outcome));
                });
            }
            Effect::ClearRemote => {
                self.transcript_scroll = 0;
                self.notice = Some("Chat cleared".to_string());
                let client = Arc::clone(&self.client);
                self.pending_clear = Some(tokio::spawn(async move {
                    clear_remote(client.as_ref()).await;
                }));
            }
            Effect::FocusInput => {
                self.input_mode = InputMode::Editing;
            }
        }
    }

    pub fn on_chat_finished(&mut self, outcome: Result<ChatReply, ClientError>) {
        self.session.complete_submit(outcome);
        self.scroll_transcript_to_bottom();
    }

    /// Open the model picker and fetch the endpoint's model list.
    pub fn open_model_picker(&mut self) {
        self.show_model_picker = true;
        self.select_current_model();
        if self.models_loading {
            return;
        }
        self.models_loading = true;
        let client = Arc::clone(&self.client);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let models = client.list_models().await;
            let _ = tx.send(AppEvent::ModelsLoaded(models));
        });
    }

    pub fn on_models_loaded(&mut self, models: Result<Vec<ModelInfo>, ClientError>) {
        self.models_loading = false;
        match models {
            Ok(models) => {
                self.available_models = models.into_iter().map(|m| m.id).collect();
                self.select_current_model();
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not list models");
                self.notice = Some(format!("Could not list models: {}", err.user_message()));
            }
        }
    }

    fn select_current_model(&mut self) {
        let current = self.session.settings().model();
        let idx = self
            .available_models
            .iter()
            .position(|m| m == current)
            .or(if self.available_models.is_empty() { None } else { Some(0) });
        self.model_picker_state.select(idx);
    }

    pub fn model_picker_nav_down(&mut self) {
        if self.available_models.is_empty() {
            return;
        }
        let i = self.model_picker_state.selected().unwrap_or(0);
        let next = (i + 1).min(self.available_models.len() - 1);
        self.model_picker_state.select(Some(next));
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        let chosen = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned();
        if let Some(model) = chosen {
            if let Err(err) = Config::save_default_model(&model) {
                tracing::warn!(error = %err, "could not persist selected model");
            }
            self.dispatch(UserIntent::SelectModel(model));
        }
        self.show_model_picker = false;
    }

    pub fn adjust_temperature(&mut self, delta: f64) {
        let current = self.session.settings().temperature();
        let next = ((current + delta) * 10.0).round() / 10.0;
        self.dispatch(UserIntent::SetTemperature(next));
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    /// Scroll the transcript so the newest entry (or "Thinking...") is visible
    pub fn scroll_transcript_to_bottom(&mut self) {
        // Use actual pane width for wrap calculation, default to 50 if not set
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.session.transcript().messages() {
            total_lines += 1; // Role line ("You · 09:41 AM")
            for line in msg.content().lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                total_lines += line.chars().count() / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }

        if self.session.is_sending() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }
}
