mod comparison;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod progress;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::comparison::Comparator;
use crate::config::Config;
use crate::extraction::ocr::OcrEngine;
use crate::extraction::Extractor;
use crate::llm_client::HostedModel;
use crate::routes::build_router;
use crate::session::orchestrator::Orchestrator;
use crate::session::store::SessionStore;
use crate::state::AppState;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Aquraid API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize hosted model client (credential is supplied per session)
    let model = HostedModel::new(config.llm_settings())?;
    info!(
        "LLM client initialized (model: {}, base: {})",
        model.model(),
        config.llm_api_base
    );

    // Initialize extraction pipeline
    let ocr = OcrEngine::new(config.tesseract_path.clone(), config.ocr_timeout);
    info!(
        "Extractor initialized (OCR: {}, image uploads: {})",
        config.tesseract_path,
        if config.accept_image_uploads {
            "accepted"
        } else {
            "rejected"
        }
    );

    let orchestrator = Orchestrator::new(
        Extractor::new(ocr),
        Comparator::new(Arc::new(model)),
        config.accept_image_uploads,
        config.progress_tick,
    );

    // Build app state
    let state = AppState {
        sessions: SessionStore::default(),
        orchestrator,
    };

    spawn_session_sweeper(state.sessions.clone(), config.session_ttl);

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the front-end host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Discards sessions idle for longer than `ttl`, so uploads never outlive their use.
fn spawn_session_sweeper(sessions: SessionStore, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL.min(ttl.max(Duration::from_secs(1))));
        loop {
            interval.tick().await;
            sessions.sweep_idle(ttl).await;
            debug!("{} live session(s)", sessions.len().await);
        }
    });
}
