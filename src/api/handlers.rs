use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::{header, HeaderName, Method, StatusCode, Uri},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
use futures::{stream, StreamExt};
use serde_json::json;

use super::{ApiError, AppState};
use crate::run::RunEvent;
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, FeedbackRequest, FeedbackResponse, FeedbackType,
    RunAgentInput, TopicSearchParams,
};

// ============ Health Handlers ============

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let profile = state.generator.profile();
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "producer": state.producer_kind,
        "contextLoaded": state.context.is_loaded(),
        "contextChars": state.context.chars(),
        "contextDocuments": state.context.documents,
        "syntheticSteps": profile.include_synthetic_steps,
    }))
}

/// GET /health/producer - probes the active producer (upstream API for
/// the completion producer)
pub async fn health_producer(State(state): State<AppState>) -> impl IntoResponse {
    let producer = state.generator.producer();
    let result = producer.health_check().await;
    Json(json!({
        "producer": producer.name(),
        "available": result.is_ok(),
        "error": result.err().map(|e| e.to_string()),
    }))
}

// ============ Run Handlers ============

/// Encode one event as an SSE `data:` block
fn run_event_to_sse(event: RunEvent) -> anyhow::Result<Event> {
    Ok(Event::default().data(event.to_json()?))
}

/// POST /v1/agent - run the agent, streaming AG-UI events (SSE)
pub async fn run_agent(
    State(state): State<AppState>,
    payload: Result<Json<RunAgentInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload.map_err(|e| ApiError::MalformedRequest(e.body_text()))?;

    // A failure before the first event is still reported as plain JSON
    let mut events = state.generator.start(input);
    let first = match events.next().await {
        Some(Ok(event)) => event,
        Some(Err(e)) => return Err(ApiError::Internal(e)),
        None => return Err(ApiError::Internal(anyhow::anyhow!("run produced no events"))),
    };

    let stream = stream::once(async move { Ok(first) })
        .chain(events)
        .map(|event| event.and_then(run_event_to_sse));

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(stream)).into_response())
}

/// GET /v1/topics - keyword categories of the static responder
pub async fn list_topics(State(state): State<AppState>) -> impl IntoResponse {
    let topics = state.registry.topics();
    Json(json!({
        "total": topics.len(),
        "topics": topics,
    }))
}

/// GET /v1/topics/search?q= - topics whose name, keywords or reply match
pub async fn search_topics(
    State(state): State<AppState>,
    Query(params): Query<TopicSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidParams {
            code: "MISSING_PARAMS",
            message: "query parameter \"q\" is required".to_string(),
        })?;

    let results: Vec<_> = state
        .registry
        .search(&query)
        .into_iter()
        .map(|topic| {
            json!({
                "name": topic.name,
                "keywords": topic.keywords,
                "reply": topic.reply,
            })
        })
        .collect();
    Ok(Json(json!({
        "query": query,
        "count": results.len(),
        "results": results,
    })))
}

/// POST /v1/chat - non-streamed answer for clients without SSE
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::MalformedRequest(e.body_text()))?;
    let question = req
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidParams {
            code: "MISSING_QUESTION",
            message: "question is required".to_string(),
        })?;

    let producer = state.generator.producer();
    let mut fragments = producer.produce(&[ChatMessage::user(question.as_str())]);
    let mut answer = String::new();
    while let Some(fragment) = fragments.next().await {
        answer.push_str(&fragment?);
    }

    tracing::info!(
        producer = producer.name(),
        chars = answer.chars().count(),
        "chat answered"
    );

    Ok(Json(ChatResponse {
        answer,
        question,
        conversation_id: req.conversation_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        source: producer.name().to_string(),
    }))
}

/// POST /v1/feedback - like/dislike on an assistant message
pub async fn feedback(
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::MalformedRequest(e.body_text()))?;

    let missing = || ApiError::InvalidParams {
        code: "MISSING_PARAMS",
        message: "messageId and feedbackType are required".to_string(),
    };
    let message_id = req
        .message_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(missing)?;
    let feedback_type = match req.feedback_type.as_deref().map(str::trim) {
        None | Some("") => return Err(missing()),
        Some("positive") => FeedbackType::Positive,
        Some("negative") => FeedbackType::Negative,
        Some(_) => {
            return Err(ApiError::InvalidParams {
                code: "INVALID_FEEDBACK_TYPE",
                message: "feedbackType must be \"positive\" or \"negative\"".to_string(),
            })
        }
    };

    tracing::info!(
        message_id = %message_id,
        feedback = ?feedback_type,
        thread_id = req.thread_id.as_deref().unwrap_or("-"),
        "feedback received"
    );

    Ok(Json(FeedbackResponse {
        success: true,
        message_id,
        feedback_type,
        thread_id: req.thread_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Unknown routes
pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "endpoint not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
