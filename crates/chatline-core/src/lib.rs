pub mod client;
pub mod composer;
pub mod config;
pub mod message;
pub mod sanitize;
pub mod session;
pub mod transcript;
pub mod view;

// Re-export main types for convenience
pub use client::{
    ChatReply, ChatRequest, ClientError, HealthStatus, HttpChatClient, ModelInfo,
    RemoteChatClient,
};
pub use composer::{Composer, ComposerError, MAX_INPUT_CHARS};
pub use config::{ChatSettings, Config};
pub use message::{Message, Role};
pub use sanitize::{escape, HtmlEscaper, Sanitizer, TerminalEscaper};
pub use session::{
    clear_remote, ClearRejected, IntentError, SessionController, SessionState, SubmitRejected,
};
pub use transcript::{DisplayRecord, Transcript};
pub use view::{Effect, SessionView, UserIntent};
