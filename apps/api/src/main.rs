mod config;
mod errors;
mod extraction;
mod intake;
mod parser_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::ContentExtractor;
use crate::intake::session::SessionStore;
use crate::parser_client::ParsingClient;
use crate::routes::build_router;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Intake API v{}", env!("CARGO_PKG_VERSION"));

    // One parsing client for the whole process, shared by reference through AppState
    let parser = ParsingClient::new(config.parser_base_url.clone())?;
    info!("Parsing client initialized (endpoint: {})", parser.endpoint());

    info!(
        "Upload limit: {} bytes, accepted types: pdf, docx",
        config.max_upload_bytes
    );

    let sessions = SessionStore::with_ttl(chrono::Duration::seconds(i64::from(
        config.session_ttl_secs,
    )));
    sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);
    info!("Session TTL: {}s", config.session_ttl_secs);

    let state = AppState {
        config: config.clone(),
        extractor: Arc::new(ContentExtractor::new()),
        parser: Arc::new(parser),
        sessions,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the front-end origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
