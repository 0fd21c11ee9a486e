use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::stream;
use goland_agent::agent::{degrade_errors, FragmentStream, DEFAULT_REPLY};
use goland_agent::{
    create_router, AppConfig, AppState, ChatMessage, ContentProducer, ContextBundle,
    ProducerKind, ResponderRegistry, RunProfile, StaticResponder,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Upstream stand-in: two fragments, then a dropped connection
struct FlakyUpstream;

impl ContentProducer for FlakyUpstream {
    fn name(&self) -> &str {
        "flaky"
    }

    fn produce(&self, _history: &[ChatMessage]) -> FragmentStream {
        Box::pin(degrade_errors(stream::iter(vec![
            Ok("Nuestros aceites ".to_string()),
            Ok("son prensados en frío".to_string()),
            Err(anyhow!("upstream connection reset")),
        ])))
    }
}

fn static_app(profile: RunProfile) -> Router {
    create_router(AppState::with_producer(
        Arc::new(StaticResponder::default()),
        ProducerKind::Static,
        profile,
        ContextBundle::empty(),
    ))
}

fn reply_of(topic: &str) -> &'static str {
    ResponderRegistry::builtin()
        .topics()
        .iter()
        .find(|t| t.name == topic)
        .unwrap()
        .reply
}

async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, header::HeaderMap, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Decode `data: <json>` blocks of an SSE body
fn sse_events(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let data = block
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("unexpected SSE block: {block:?}"));
            serde_json::from_str(data).unwrap()
        })
        .collect()
}

fn types(events: &[Value]) -> Vec<&str> {
    events.iter().map(|e| e["type"].as_str().unwrap()).collect()
}

fn assembled_text(events: &[Value]) -> String {
    events
        .iter()
        .filter(|e| e["type"] == "TEXT_MESSAGE_CONTENT")
        .map(|e| e["delta"].as_str().unwrap())
        .collect()
}

fn agent_body(text: &str) -> String {
    json!({"messages": [{"role": "user", "content": text}]}).to_string()
}

#[tokio::test]
async fn scenario_greeting_streams_hola_reply() {
    let app = static_app(RunProfile::minimal());
    let (status, headers, body) = post(app, "/v1/agent", &agent_body("Hola, buenos dias")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let events = sse_events(&body);
    assert_eq!(assembled_text(&events), reply_of("hola"));
    assert!(events
        .iter()
        .filter(|e| e["type"] == "TEXT_MESSAGE_CONTENT")
        .all(|e| e["delta"].as_str().unwrap().chars().count() <= 3));
}

#[tokio::test]
async fn scenario_price_question_streams_precio_reply() {
    let (_, _, body) = post(
        static_app(RunProfile::minimal()),
        "/v1/agent",
        &agent_body("cuanto cuesta el aceite"),
    )
    .await;
    assert_eq!(assembled_text(&sse_events(&body)), reply_of("precio"));
}

#[tokio::test]
async fn scenario_unknown_question_streams_default_reply() {
    let (_, _, body) = post(
        static_app(RunProfile::minimal()),
        "/v1/agent",
        &agent_body("cual es la capital de Francia"),
    )
    .await;
    assert_eq!(assembled_text(&sse_events(&body)), DEFAULT_REPLY);
}

#[tokio::test(start_paused = true)]
async fn rich_profile_wire_sequence() {
    let body = json!({
        "threadId": "thread-1",
        "messages": [
            {"role": "user", "content": "hola"},
            {"role": "assistant", "content": "¡Hola!"},
            {"role": "user", "content": "hacen envíos a Salto?"}
        ]
    })
    .to_string();
    let (_, _, body) = post(static_app(RunProfile::default()), "/v1/agent", &body).await;
    let events = sse_events(&body);
    let kinds = types(&events);

    assert_eq!(
        &kinds[..8],
        &[
            "RUN_STARTED",
            "STEP_STARTED",
            "STEP_FINISHED",
            "STEP_STARTED",
            "STEP_FINISHED",
            "STEP_STARTED",
            "TEXT_MESSAGE_START",
            "TEXT_MESSAGE_CONTENT"
        ]
    );
    assert_eq!(
        &kinds[kinds.len() - 3..],
        &["TEXT_MESSAGE_END", "STEP_FINISHED", "RUN_FINISHED"]
    );

    let first = &events[0];
    let last = events.last().unwrap();
    assert_eq!(first["threadId"], "thread-1");
    assert_eq!(first["runId"], last["runId"]);
    assert_eq!(last["threadId"], "thread-1");

    assert_eq!(events[1]["stepName"], "reasoning");
    assert_eq!(events[1]["stepId"], events[2]["stepId"]);
    assert_eq!(events[3]["stepName"], "tool:mock_search");
    assert_eq!(events[3]["stepId"], events[4]["stepId"]);
    assert_eq!(events[5]["stepName"], "response");
    assert_eq!(events[5]["stepId"], events[events.len() - 2]["stepId"]);

    let message_id = &events[6]["messageId"];
    assert_eq!(events[6]["role"], "assistant");
    assert!(events[7..events.len() - 2]
        .iter()
        .all(|e| &e["messageId"] == message_id));

    assert_eq!(assembled_text(&events), reply_of("envio"));
}

#[tokio::test]
async fn events_omit_absent_fields() {
    let app = static_app(RunProfile::minimal());
    let (_, _, body) = post(app, "/v1/agent", &agent_body("hola")).await;
    for event in sse_events(&body) {
        let object = event.as_object().unwrap();
        assert!(object.values().all(|v| !v.is_null()), "null field in {event}");
    }
}

#[tokio::test]
async fn upstream_failure_still_finishes_run() {
    let app = create_router(AppState::with_producer(
        Arc::new(FlakyUpstream),
        ProducerKind::Completion,
        RunProfile::minimal(),
        ContextBundle::empty(),
    ));
    let (status, _, body) = post(app, "/v1/agent", &agent_body("aceites?")).await;
    assert_eq!(status, StatusCode::OK);

    let events = sse_events(&body);
    let kinds = types(&events);
    assert_eq!(
        &kinds[kinds.len() - 3..],
        &["TEXT_MESSAGE_END", "STEP_FINISHED", "RUN_FINISHED"]
    );
    let text = assembled_text(&events);
    assert!(text.starts_with("Nuestros aceites son prensados en frío\n\n[Error: "));
    assert!(text.contains("upstream connection reset"));
}

/// OpenAI-style SSE body; `None` is a role-only delta
fn upstream_body(deltas: &[Option<&str>]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let delta = match delta {
            Some(content) => json!({ "content": content }),
            None => json!({ "role": "assistant" }),
        };
        let chunk = json!({ "choices": [{ "delta": delta, "finish_reason": null }] });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn completion_mode_streams_upstream_fragments() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("Envíos a todo Uruguay");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(upstream_body(&[None, Some("Enviamos "), Some("a todo el país.")]));
        })
        .await;

    let config = AppConfig::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        "OPENAI_BASE_URL" => Some(server.base_url()),
        "AGENT_SYNTHETIC_STEPS" => Some("false".to_string()),
        _ => None,
    });
    let context = ContextBundle {
        text: Arc::from("### envios.md\nEnvíos a todo Uruguay."),
        documents: vec!["envios.md".to_string()],
    };
    let app = create_router(AppState::new(&config, context).unwrap());

    let (status, _, body) = post(app, "/v1/agent", &agent_body("hacen envíos?")).await;
    assert_eq!(status, StatusCode::OK);
    upstream.assert_async().await;

    let events = sse_events(&body);
    assert_eq!(
        types(&events),
        vec![
            "RUN_STARTED",
            "STEP_STARTED",
            "TEXT_MESSAGE_START",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_END",
            "STEP_FINISHED",
            "RUN_FINISHED"
        ]
    );
    assert_eq!(assembled_text(&events), "Enviamos a todo el país.");
}

#[tokio::test]
async fn malformed_body_is_rejected_before_streaming() {
    let app = static_app(RunProfile::minimal());
    let (status, headers, body) = post(app.clone(), "/v1/agent", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let error: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["code"], "MALFORMED_REQUEST");

    let (status, _, _) = post(app, "/v1/agent", r#"{"threadId":"t"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_producer_and_context() {
    let (status, health) = get(static_app(RunProfile::default()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["producer"], "static");
    assert_eq!(health["contextLoaded"], false);
    assert_eq!(health["syntheticSteps"], true);

    let (_, producer) = get(static_app(RunProfile::default()), "/health/producer").await;
    assert_eq!(producer["producer"], "static");
    assert_eq!(producer["available"], true);
}

#[tokio::test]
async fn topics_lists_registry_categories() {
    let (status, topics) = get(static_app(RunProfile::minimal()), "/v1/topics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(topics["total"], 5);
    assert_eq!(topics["topics"][0]["name"], "hola");
    assert!(topics["topics"][2]["keywords"]
        .as_array()
        .unwrap()
        .contains(&json!("cuanto cuesta")));
}

#[tokio::test]
async fn topic_search_matches_keywords_and_replies() {
    let app = static_app(RunProfile::minimal());

    let (status, found) = get(app.clone(), "/v1/topics/search?q=Delivery").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["query"], "Delivery");
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["name"], "envio");
    assert_eq!(found["results"][0]["reply"], reply_of("envio"));

    let (_, none) = get(app.clone(), "/v1/topics/search?q=zzz").await;
    assert_eq!(none["count"], 0);
    assert_eq!(none["results"], json!([]));

    let (status, error) = get(app.clone(), "/v1/topics/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "MISSING_PARAMS");

    let (status, _) = get(app, "/v1/topics/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_returns_the_whole_answer_at_once() {
    let app = static_app(RunProfile::default());

    let (status, _, body) = post(
        app.clone(),
        "/v1/chat",
        r#"{"question":"cuanto cuesta el aceite","conversationId":"c-1"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let answer: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(answer["answer"], reply_of("precio"));
    assert_eq!(answer["question"], "cuanto cuesta el aceite");
    assert_eq!(answer["conversationId"], "c-1");
    assert_eq!(answer["source"], "static");

    let (status, _, body) = post(app, "/v1/chat", r#"{"question":"  "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["code"], "MISSING_QUESTION");
}

#[tokio::test]
async fn feedback_is_validated_and_echoed() {
    let app = static_app(RunProfile::minimal());

    let (status, _, body) = post(
        app.clone(),
        "/v1/feedback",
        r#"{"messageId":"m-1","feedbackType":"positive","threadId":"t-1"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let echoed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(echoed["success"], true);
    assert_eq!(echoed["messageId"], "m-1");
    assert_eq!(echoed["feedbackType"], "positive");
    assert_eq!(echoed["threadId"], "t-1");

    let (status, _, body) = post(app.clone(), "/v1/feedback", r#"{"messageId":"m-1"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["code"], "MISSING_PARAMS");

    let (status, _, body) = post(
        app,
        "/v1/feedback",
        r#"{"messageId":"m-1","feedbackType":"meh"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap()["code"],
        "INVALID_FEEDBACK_TYPE"
    );
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (status, body) = get(static_app(RunProfile::minimal()), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/api/nope");
    assert_eq!(body["method"], "GET");
}

#[tokio::test(start_paused = true)]
async fn static_replies_are_paced_when_configured() {
    let config = AppConfig::from_lookup(|key| match key {
        "AGENT_SYNTHETIC_STEPS" => Some("false".to_string()),
        "AGENT_CHUNK_SIZE" => Some("5".to_string()),
        "AGENT_TYPING_DELAY_MS" => Some("20".to_string()),
        _ => None,
    });
    let app = create_router(AppState::new(&config, ContextBundle::empty()).unwrap());

    let started = tokio::time::Instant::now();
    let (_, _, body) = post(app, "/v1/agent", &agent_body("hola")).await;
    let events = sse_events(&body);

    let deltas = events
        .iter()
        .filter(|e| e["type"] == "TEXT_MESSAGE_CONTENT")
        .count();
    assert_eq!(deltas, reply_of("hola").chars().count().div_ceil(5));
    assert!(started.elapsed() >= Duration::from_millis(20) * (deltas as u32 - 1));
    assert_eq!(assembled_text(&events), reply_of("hola"));
}
