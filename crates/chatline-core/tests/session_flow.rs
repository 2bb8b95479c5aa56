//! Send/clear protocol driven through a scripted endpoint.

use async_trait::async_trait;
use chatline_core::{
    escape, ChatReply, ChatRequest, ChatSettings, ClientError, Role, SessionController,
    SessionState, SubmitRejected,
};
use chatline_core::client::RemoteChatClient;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<ChatReply, ClientError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    clear_result: Mutex<Option<ClientError>>,
    clear_calls: Mutex<usize>,
}

impl ScriptedClient {
    fn replying(replies: Vec<Result<ChatReply, ClientError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn failing_clear(err: ClientError) -> Self {
        Self {
            clear_result: Mutex::new(Some(err)),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn clear_calls(&self) -> usize {
        *self.clear_calls.lock().unwrap()
    }
}

#[async_trait]
impl RemoteChatClient for ScriptedClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("no scripted reply".into())))
    }

    async fn clear_conversation(&self) -> Result<(), ClientError> {
        *self.clear_calls.lock().unwrap() += 1;
        match self.clear_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn ok(reply: &str) -> Result<ChatReply, ClientError> {
    Ok(ChatReply {
        reply: reply.to_string(),
    })
}

fn session() -> SessionController {
    SessionController::with_welcome(ChatSettings::default(), "Hello! How can I help?")
}

#[tokio::test]
async fn hello_round_trip_builds_expected_request_and_transcript() {
    let client = ScriptedClient::replying(vec![ok("Hi there")]);
    let mut session = SessionController::with_welcome(
        ChatSettings {
            model: Some("gpt-4".into()),
            temperature: Some(0.7),
        },
        "Welcome",
    );

    session.set_text("Hello").unwrap();
    session.submit(&client).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let body = serde_json::to_value(&requests[0]).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "message": "Hello",
            "model": "gpt-4",
            "temperature": 0.7,
            "max_tokens": 1000
        })
    );

    let messages = session.transcript().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role(), Role::User);
    assert_eq!(messages[1].content(), "Hello");
    assert_eq!(messages[2].role(), Role::Assistant);
    assert_eq!(messages[2].content(), "Hi there");
    assert_eq!(session.state(), &SessionState::Idle);
}

#[tokio::test]
async fn missing_selectors_use_defaults() {
    let client = ScriptedClient::replying(vec![ok("sure")]);
    let mut session = SessionController::new(ChatSettings::default());
    session.set_text("defaults?").unwrap();
    session.submit(&client).await.unwrap();

    let request = &client.requests()[0];
    assert_eq!(request.model, "gpt-4");
    assert_eq!(request.temperature, 0.7);
    assert_eq!(request.max_tokens, 1000);
}

#[tokio::test]
async fn submit_while_sending_issues_no_second_request() {
    let client = ScriptedClient::replying(vec![ok("first reply")]);
    let mut session = session();

    session.set_text("first").unwrap();
    let pending = session.begin_submit().unwrap();
    let len_while_sending = session.transcript().len();

    session.set_text("second").unwrap();
    assert_eq!(session.submit(&client).await, Err(SubmitRejected::InFlight));
    assert!(client.requests().is_empty());
    assert_eq!(session.transcript().len(), len_while_sending);

    let outcome = client.send_chat(&pending).await;
    session.complete_submit(outcome);
    assert_eq!(client.requests().len(), 1);
    assert_eq!(session.transcript().len(), len_while_sending + 1);
    assert_eq!(session.composer().text(), "second");
}

#[tokio::test]
async fn service_failure_surfaces_message_and_appends_nothing() {
    let client =
        ScriptedClient::replying(vec![Err(ClientError::Service(Some("rate limited".into())))]);
    let mut session = session();

    session.set_text("Hello").unwrap();
    let before = session.transcript().len();
    session.submit(&client).await.unwrap();

    assert_eq!(session.state(), &SessionState::Error("rate limited".into()));
    // Only the user entry from this turn.
    assert_eq!(session.transcript().len(), before + 1);
    assert_eq!(session.transcript().last().unwrap().role(), Role::User);

    session.acknowledge();
    assert_eq!(session.state(), &SessionState::Idle);
}

#[tokio::test]
async fn failure_without_message_uses_fallback() {
    let client = ScriptedClient::replying(vec![Err(ClientError::Service(None))]);
    let mut session = session();
    session.set_text("x").unwrap();
    session.submit(&client).await.unwrap();
    assert_eq!(session.error_message(), Some("Failed to get response from AI"));
}

#[tokio::test]
async fn transcript_grows_by_two_per_successful_turn() {
    let client = ScriptedClient::replying(vec![ok("a"), ok("b"), ok("c")]);
    let mut session = session();

    for (turn, text) in ["one", "two", "three"].into_iter().enumerate() {
        let before = session.transcript().len();
        session.set_text(text).unwrap();
        session.submit(&client).await.unwrap();
        assert_eq!(session.transcript().len(), before + 2, "turn {turn}");
    }

    let records: Vec<_> = session.transcript().render().collect();
    for (record, message) in records.iter().zip(session.transcript().messages()) {
        assert_eq!(record.role, message.role());
        assert_eq!(record.escaped_content, escape(message.content()));
    }
}

#[tokio::test]
async fn clear_notifies_endpoint_and_keeps_welcome() {
    let client = ScriptedClient::replying(vec![ok("reply")]);
    let mut session = session();
    let welcome = session.welcome().cloned().unwrap();

    session.set_text("hi").unwrap();
    session.submit(&client).await.unwrap();
    session.clear(&client).await.unwrap();

    assert_eq!(client.clear_calls(), 1);
    assert_eq!(session.transcript().messages(), &[welcome]);
}

#[tokio::test]
async fn clear_still_resets_locally_when_endpoint_fails() {
    let client = ScriptedClient::failing_clear(ClientError::Network("down".into()));
    let mut session = SessionController::new(ChatSettings::default());
    session.set_text("hi").unwrap();
    session.begin_submit().unwrap();
    session.complete_submit(ok("hello"));

    session.clear(&client).await.unwrap();

    assert_eq!(client.clear_calls(), 1);
    assert!(session.transcript().is_empty());
    assert_eq!(session.state(), &SessionState::Idle);
    assert_eq!(session.error_message(), None);
}
