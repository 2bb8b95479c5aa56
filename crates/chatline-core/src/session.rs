//! The per-session controller.
//!
//! Submission is split into [`SessionController::begin_submit`] and
//! [`SessionController::complete_submit`] so a host can run the remote call
//! wherever it likes (a spawned task, a blocking CLI, a test double) while
//! the state machine stays here:
//!
//! ```text
//! Idle --begin_submit--> Sending --complete_submit(Ok)--> Idle
//!                                --complete_submit(Err)--> Error --acknowledge--> Idle
//! ```

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ChatReply, ChatRequest, ClientError, RemoteChatClient};
use crate::composer::{Composer, ComposerError};
use crate::config::{ChatSettings, MAX_TEMPERATURE, MIN_TEMPERATURE};
use crate::message::Message;
use crate::sanitize::{HtmlEscaper, Sanitizer};
use crate::transcript::Transcript;
use crate::view::{Effect, SessionView, UserIntent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Sending,
    /// A send failed; holds the text shown to the user.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    /// Blank input. Hosts ignore this silently.
    #[error("nothing to send")]
    Empty,
    #[error("a message is already being sent")]
    InFlight,
    #[error("the previous error has not been dismissed")]
    ErrorPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClearRejected {
    #[error("cannot clear while a message is being sent")]
    InFlight,
    #[error("the previous error has not been dismissed")]
    ErrorPending,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error(transparent)]
    Submit(#[from] SubmitRejected),
    #[error(transparent)]
    Clear(#[from] ClearRejected),
    #[error(transparent)]
    Composer(#[from] ComposerError),
}

pub struct SessionController {
    composer: Composer,
    transcript: Transcript,
    state: SessionState,
    settings: ChatSettings,
    welcome: Option<Message>,
}

impl SessionController {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            composer: Composer::new(),
            transcript: Transcript::new(),
            state: SessionState::Idle,
            settings,
            welcome: None,
        }
    }

    /// Start with an assistant welcome entry that survives clears.
    pub fn with_welcome(settings: ChatSettings, welcome: impl Into<String>) -> Self {
        let welcome = Message::assistant(welcome);
        Self {
            transcript: Transcript::with_welcome(welcome.clone()),
            welcome: Some(welcome),
            ..Self::new(settings)
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state == SessionState::Sending
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Cursor-level editing for hosts that feed keystrokes.
    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn welcome(&self) -> Option<&Message> {
        self.welcome.as_ref()
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ComposerError> {
        self.composer.set_text(text)
    }

    pub fn can_submit(&self) -> bool {
        self.composer.is_submittable(self.is_sending())
    }

    pub fn select_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        info!(%model, "model selected");
        self.settings.model = Some(model);
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        if !temperature.is_finite() {
            warn!(temperature, "ignoring non-finite temperature");
            return;
        }
        self.settings.temperature = Some(temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE));
    }

    /// Run the first half of the send protocol.
    ///
    /// On success the user message is already in the transcript, the
    /// composer is empty and the session is `Sending`; the caller must issue
    /// the returned request and report back through [`Self::complete_submit`].
    pub fn begin_submit(&mut self) -> Result<ChatRequest, SubmitRejected> {
        match self.state {
            SessionState::Sending => return Err(SubmitRejected::InFlight),
            SessionState::Error(_) => return Err(SubmitRejected::ErrorPending),
            SessionState::Idle => {}
        }

        let text = self.composer.consume().ok_or(SubmitRejected::Empty)?;
        self.transcript.append(Message::user(text.clone()));
        self.state = SessionState::Sending;

        let request = self.settings.request_for(text);
        debug!(
            model = %request.model,
            temperature = request.temperature,
            chars = request.message.chars().count(),
            "chat request built"
        );
        Ok(request)
    }

    /// Finish a send started by [`Self::begin_submit`].
    pub fn complete_submit(&mut self, outcome: Result<ChatReply, ClientError>) {
        if !self.is_sending() {
            warn!(state = ?self.state, "ignoring chat completion with no request in flight");
            return;
        }

        match outcome {
            Ok(ChatReply { reply }) => {
                self.transcript.append(Message::assistant(reply));
                self.state = SessionState::Idle;
                debug!(entries = self.transcript.len(), "reply appended");
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.state = SessionState::Error(err.user_message());
            }
        }
    }

    /// Full send protocol against `client`.
    pub async fn submit<C>(&mut self, client: &C) -> Result<(), SubmitRejected>
    where
        C: RemoteChatClient + ?Sized,
    {
        let request = self.begin_submit()?;
        let outcome = client.send_chat(&request).await;
        self.complete_submit(outcome);
        Ok(())
    }

    /// Dismiss the error surface. Returns whether there was one.
    pub fn acknowledge(&mut self) -> bool {
        if matches!(self.state, SessionState::Error(_)) {
            self.state = SessionState::Idle;
            true
        } else {
            false
        }
    }

    fn check_can_clear(&self) -> Result<(), ClearRejected> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Sending => Err(ClearRejected::InFlight),
            SessionState::Error(_) => Err(ClearRejected::ErrorPending),
        }
    }

    /// Reset the local transcript to at most the welcome entry.
    pub fn clear_transcript(&mut self) -> Result<(), ClearRejected> {
        self.check_can_clear()?;
        self.transcript.reset(self.welcome.clone());
        info!(kept = self.transcript.len(), "transcript cleared");
        Ok(())
    }

    /// Ask the endpoint to clear, then clear locally whatever it answered.
    pub async fn clear<C>(&mut self, client: &C) -> Result<(), ClearRejected>
    where
        C: RemoteChatClient + ?Sized,
    {
        self.check_can_clear()?;
        clear_remote(client).await;
        self.clear_transcript()
    }

    pub fn handle(&mut self, intent: UserIntent) -> Result<Option<Effect>, IntentError> {
        match intent {
            UserIntent::Edit(text) => {
                self.set_text(text)?;
                Ok(None)
            }
            UserIntent::Submit => Ok(Some(Effect::SendChat(self.begin_submit()?))),
            UserIntent::Acknowledge => {
                self.acknowledge();
                Ok(None)
            }
            // Local reset lands here; the remote one is the host's effect and
            // must settle before the host sends the next chat request.
            UserIntent::TriggerClear => {
                self.clear_transcript()?;
                Ok(Some(Effect::ClearRemote))
            }
            UserIntent::FocusInput => Ok(Some(Effect::FocusInput)),
            UserIntent::SelectModel(model) => {
                self.select_model(model);
                Ok(None)
            }
            UserIntent::SetTemperature(temperature) => {
                self.set_temperature(temperature);
                Ok(None)
            }
        }
    }

    pub fn view(&self) -> SessionView {
        self.view_with(HtmlEscaper)
    }

    pub fn view_with<S: Sanitizer>(&self, sanitizer: S) -> SessionView {
        let error = self.error_message().map(str::to_string);
        SessionView {
            transcript: self.transcript.render_with(sanitizer).collect(),
            input_text: self.composer.text().to_string(),
            input_cursor: self.composer.cursor(),
            input_count: self.composer.count(),
            count_label: self.composer.count_label(),
            submit_enabled: self.can_submit() && error.is_none(),
            loading: self.is_sending(),
            error,
            model: self.settings.model().to_string(),
            temperature: self.settings.temperature(),
        }
    }
}

/// Best-effort remote clear. Failures are logged and otherwise dropped.
pub async fn clear_remote<C>(client: &C)
where
    C: RemoteChatClient + ?Sized,
{
    if let Err(err) = client.clear_conversation().await {
        warn!(error = %err, "endpoint failed to clear the conversation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn controller() -> SessionController {
        SessionController::with_welcome(ChatSettings::default(), "Welcome!")
    }

    #[test]
    fn begin_submit_appends_user_message_and_clears_composer() {
        let mut session = controller();
        session.set_text("  Hello ").unwrap();

        let request = session.begin_submit().unwrap();

        assert_eq!(request.message, "Hello");
        assert_eq!(session.state(), &SessionState::Sending);
        assert_eq!(session.composer().text(), "");
        let last = session.transcript().last().unwrap();
        assert_eq!(last.role(), Role::User);
        assert_eq!(last.content(), "Hello");
    }

    #[test]
    fn blank_input_is_skipped_without_side_effects() {
        let mut session = controller();
        session.set_text("   ").unwrap();
        assert_eq!(session.begin_submit(), Err(SubmitRejected::Empty));
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn nothing_is_submittable_while_sending() {
        let mut session = controller();
        session.set_text("first").unwrap();
        session.begin_submit().unwrap();

        session.set_text("second").unwrap();
        assert!(!session.can_submit());
        assert!(!session.view().submit_enabled);
        assert_eq!(session.begin_submit(), Err(SubmitRejected::InFlight));
        assert_eq!(session.composer().text(), "second");
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn failure_moves_to_error_until_acknowledged() {
        let mut session = controller();
        session.set_text("hi").unwrap();
        session.begin_submit().unwrap();
        session.complete_submit(Err(ClientError::Network("refused".into())));

        assert_eq!(session.error_message(), Some("Network error. Please try again."));
        assert_eq!(session.transcript().len(), 2);

        session.set_text("again").unwrap();
        assert_eq!(session.begin_submit(), Err(SubmitRejected::ErrorPending));
        assert_eq!(session.clear_transcript(), Err(ClearRejected::ErrorPending));

        assert!(session.acknowledge());
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(!session.acknowledge());
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut session = controller();
        session.complete_submit(Ok(ChatReply {
            reply: "unexpected".into(),
        }));
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn clear_is_rejected_while_sending() {
        let mut session = controller();
        session.set_text("hi").unwrap();
        session.begin_submit().unwrap();
        assert_eq!(session.clear_transcript(), Err(ClearRejected::InFlight));
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn clear_keeps_only_the_welcome_entry() {
        let mut session = controller();
        let welcome_id = session.welcome().unwrap().id();
        for text in ["one", "two"] {
            session.set_text(text).unwrap();
            session.begin_submit().unwrap();
            session.complete_submit(Ok(ChatReply {
                reply: format!("re: {text}"),
            }));
        }
        assert_eq!(session.transcript().len(), 5);

        session.clear_transcript().unwrap();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().messages()[0].id(), welcome_id);
    }

    #[test]
    fn clear_without_welcome_empties_transcript() {
        let mut session = SessionController::new(ChatSettings::default());
        session.set_text("hi").unwrap();
        session.begin_submit().unwrap();
        session.complete_submit(Ok(ChatReply { reply: "yo".into() }));
        session.clear_transcript().unwrap();
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn intents_map_to_effects() {
        let mut session = controller();
        assert_eq!(
            session.handle(UserIntent::Edit("Hello".into())).unwrap(),
            None
        );
        match session.handle(UserIntent::Submit).unwrap() {
            Some(Effect::SendChat(request)) => assert_eq!(request.message, "Hello"),
            other => panic!("unexpected effect: {other:?}"),
        }
        assert!(matches!(
            session.handle(UserIntent::TriggerClear),
            Err(IntentError::Clear(ClearRejected::InFlight))
        ));
        assert_eq!(
            session.handle(UserIntent::FocusInput).unwrap(),
            Some(Effect::FocusInput)
        );

        session.complete_submit(Ok(ChatReply { reply: "Hi".into() }));
        assert_eq!(
            session.handle(UserIntent::TriggerClear).unwrap(),
            Some(Effect::ClearRemote)
        );
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn temperature_is_clamped_and_model_selected() {
        let mut session = controller();
        session.handle(UserIntent::SetTemperature(3.5)).unwrap();
        session
            .handle(UserIntent::SelectModel("gemini-pro".into()))
            .unwrap();
        let view = session.view();
        assert_eq!(view.temperature, MAX_TEMPERATURE);
        assert_eq!(view.model, "gemini-pro");

        session.handle(UserIntent::SetTemperature(f64::NAN)).unwrap();
        assert_eq!(session.settings().temperature(), MAX_TEMPERATURE);
    }

    #[test]
    fn view_reports_signals() {
        let mut session = controller();
        session.set_text("<b>hey</b>").unwrap();
        let view = session.view();
        assert_eq!(view.input_count, 10);
        assert_eq!(view.count_label, "10/4000");
        assert!(view.submit_enabled);
        assert!(!view.loading);
        assert_eq!(view.error, None);
        assert_eq!(view.model, "gpt-4");

        session.begin_submit().unwrap();
        let view = session.view();
        assert!(view.loading);
        assert_eq!(view.transcript[1].escaped_content, "&lt;b&gt;hey&lt;/b&gt;");
    }
}
