use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use goland_agent::{create_router, load_context, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goland_agent=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // reference context is loaded once, before accepting requests
    let context = load_context(&config.context_dir, config.max_context_chars);
    let state = AppState::new(&config, context)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    tracing::info!(
        producer = ?config.producer_kind(),
        synthetic_steps = config.profile.include_synthetic_steps,
        "goland-agent listening on {}",
        config.addr
    );
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health           - Health check");
    tracing::info!("  GET  /health/producer  - Producer availability");
    tracing::info!("  POST /v1/agent         - Run agent (AG-UI over SSE)");
    tracing::info!("  POST /v1/chat          - Non-streamed answer");
    tracing::info!("  GET  /v1/topics        - Static responder topics");
    tracing::info!("  GET  /v1/topics/search - Search topics (?q=)");
    tracing::info!("  POST /v1/feedback      - Message feedback");

    axum::serve(listener, app).await?;

    Ok(())
}
