use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Step names emitted by the run generator
pub const STEP_REASONING: &str = "reasoning";
pub const STEP_SEARCH: &str = "tool:mock_search";
pub const STEP_RESPONSE: &str = "response";

/// AG-UI lifecycle events (SSE `data:` payloads).
///
/// Optional fields are omitted from the encoded object instead of being
/// written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEvent {
    #[serde(rename_all = "camelCase")]
    RunStarted {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    StepStarted {
        step_id: String,
        step_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    StepFinished {
        step_id: String,
        step_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageStart {
        message_id: String,
        role: Role,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageContent {
        message_id: String,
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageEnd {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    RunFinished {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

fn now_millis() -> Option<i64> {
    Some(chrono::Utc::now().timestamp_millis())
}

impl RunEvent {
    pub fn run_started(thread_id: &str, run_id: &str) -> Self {
        RunEvent::RunStarted {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn step_started(step_id: &str, step_name: &str) -> Self {
        RunEvent::StepStarted {
            step_id: step_id.to_string(),
            step_name: step_name.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn step_finished(step_id: &str, step_name: &str) -> Self {
        RunEvent::StepFinished {
            step_id: step_id.to_string(),
            step_name: step_name.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn text_message_start(message_id: &str) -> Self {
        RunEvent::TextMessageStart {
            message_id: message_id.to_string(),
            role: Role::Assistant,
            timestamp: now_millis(),
        }
    }

    pub fn text_message_content(message_id: &str, delta: String) -> Self {
        RunEvent::TextMessageContent {
            message_id: message_id.to_string(),
            delta,
            timestamp: now_millis(),
        }
    }

    pub fn text_message_end(message_id: &str) -> Self {
        RunEvent::TextMessageEnd {
            message_id: message_id.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn run_finished(thread_id: &str, run_id: &str) -> Self {
        RunEvent::RunFinished {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
            timestamp: now_millis(),
        }
    }

    /// Wire name of the event (the `type` discriminator)
    pub fn event_type(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "RUN_STARTED",
            RunEvent::StepStarted { .. } => "STEP_STARTED",
            RunEvent::StepFinished { .. } => "STEP_FINISHED",
            RunEvent::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            RunEvent::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            RunEvent::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            RunEvent::RunFinished { .. } => "RUN_FINISHED",
        }
    }

    /// JSON body for the SSE `data:` field
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
