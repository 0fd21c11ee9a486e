use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::agent::{create_producer, ContentProducer, ResponderRegistry};
use crate::config::{AppConfig, ProducerKind};
use crate::context::ContextBundle;
use crate::run::{RunGenerator, RunProfile};

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub generator: RunGenerator,
    pub producer_kind: ProducerKind,
    pub context: Arc<ContextBundle>,
    pub registry: ResponderRegistry,
}

impl AppState {
    /// State for the producer selected by `config`
    pub fn new(config: &AppConfig, context: ContextBundle) -> Result<Self> {
        let producer = create_producer(config, context.text.clone())?;
        Ok(Self::with_producer(
            producer,
            config.producer_kind(),
            config.profile.clone(),
            context,
        ))
    }

    pub fn with_producer(
        producer: Arc<dyn ContentProducer>,
        producer_kind: ProducerKind,
        profile: RunProfile,
        context: ContextBundle,
    ) -> Self {
        Self {
            generator: RunGenerator::new(producer, profile),
            producer_kind,
            context: Arc::new(context),
            registry: ResponderRegistry::builtin(),
        }
    }
}

/// Build the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // health
        .route("/health", get(handlers::health))
        .route("/health/producer", get(handlers::health_producer))
        // agent
        .route("/v1/agent", post(handlers::run_agent))
        .route("/v1/chat", post(handlers::chat))
        .route("/v1/topics", get(handlers::list_topics))
        .route("/v1/topics/search", get(handlers::search_topics))
        .route("/v1/feedback", post(handlers::feedback))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
