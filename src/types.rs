use serde::{Deserialize, Serialize};

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// tool / developer and any other role the UI may send
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Other => "other",
        }
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Message text, empty when the client sent none
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Most recent user utterance, scanning from the end of the history.
pub fn last_user_message(history: &[ChatMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.text())
}

// ============ API request/response types ============

/// POST /v1/agent request (AG-UI `RunAgentInput`)
///
/// Only `threadId` and `messages` drive the run. The remaining AG-UI fields
/// are accepted so that stock clients can talk to the server unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Ignored: every run gets a fresh id.
    #[serde(default)]
    pub run_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub state: Option<serde_json::Value>,
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
    #[serde(default)]
    pub context: Vec<serde_json::Value>,
    #[serde(default)]
    pub forwarded_props: Option<serde_json::Value>,
}

impl RunAgentInput {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            thread_id: None,
            run_id: None,
            messages,
            state: None,
            tools: Vec::new(),
            context: Vec::new(),
            forwarded_props: None,
        }
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// Feedback verdict on an assistant message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Positive,
    Negative,
}

/// POST /v1/feedback request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub feedback_type: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// POST /v1/feedback response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    pub message_id: String,
    pub feedback_type: FeedbackType,
    pub thread_id: Option<String>,
    pub timestamp: String,
}

/// POST /v1/chat request (non-streamed)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, alias = "conversation_id")]
    pub conversation_id: Option<String>,
}

/// POST /v1/chat response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub question: String,
    pub conversation_id: Option<String>,
    pub timestamp: String,
    /// Name of the producer that wrote the answer
    pub source: String,
}

/// GET /v1/topics/search query
#[derive(Debug, Deserialize)]
pub struct TopicSearchParams {
    pub q: Option<String>,
}

/// Error body for every non-streamed failure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
