use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Shown when the transport itself failed.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";
/// Shown when the endpoint reported a failure without saying why.
pub const SERVICE_ERROR_FALLBACK: &str = "Failed to get response from AI";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced a usable HTTP response.
    #[error("network error: {0}")]
    Network(String),
    /// The endpoint answered with a structured failure.
    #[error("service error: {}", .0.as_deref().unwrap_or("unspecified"))]
    Service(Option<String>),
}

impl ClientError {
    /// Text to put in front of the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ClientError::Service(Some(message)) if !message.is_empty() => message.clone(),
            ClientError::Service(_) => SERVICE_ERROR_FALLBACK.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

/// The remote conversational endpoint.
///
/// Callers are responsible for keeping at most one `send_chat` outstanding.
#[async_trait]
pub trait RemoteChatClient: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError>;

    /// Ask the endpoint to forget its side of the conversation.
    async fn clear_conversation(&self) -> Result<(), ClientError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        Ok(Vec::new())
    }
}

#[derive(Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    success: bool,
    response: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ClearEnvelope {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ModelsEnvelope {
    data: Vec<ModelInfo>,
}

/// [`RemoteChatClient`] speaking JSON over HTTP.
#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    base_url: String,
}

impl HttpChatClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.client.get(self.url("/health")).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Service(Some(format!(
                "health check failed with status {}",
                response.status()
            ))));
        }
        response
            .json::<HealthStatus>()
            .await
            .map_err(|_| ClientError::Service(None))
    }
}

#[async_trait]
impl RemoteChatClient for HttpChatClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        tracing::debug!(model = %request.model, "posting chat request");
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error statuses still carry the JSON envelope when the server produced them.
        let envelope: ChatEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) => {
                tracing::warn!(%status, "chat endpoint returned a non-JSON body");
                return Err(ClientError::Service(None));
            }
        };

        match envelope {
            ChatEnvelope {
                success: true,
                response: Some(reply),
                ..
            } if status.is_success() => Ok(ChatReply { reply }),
            ChatEnvelope { error, .. } => Err(ClientError::Service(error)),
        }
    }

    async fn clear_conversation(&self) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/api/clear"))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let envelope: ClearEnvelope = response
            .json()
            .await
            .map_err(|_| ClientError::Service(None))?;

        if status.is_success() && envelope.success {
            Ok(())
        } else {
            Err(ClientError::Service(envelope.error))
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        let response = self.client.get(self.url("/api/models")).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Service(Some(format!(
                "Failed to list models: {}",
                response.status()
            ))));
        }
        let models: ModelsEnvelope = response
            .json()
            .await
            .map_err(|_| ClientError::Service(None))?;
        Ok(models.data)
    }
}
