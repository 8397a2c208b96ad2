//! Lesson audit HTTP server binary.
//!
//! Loads the configuration, wires the roster and both schedule sources
//! together, and serves the report page and REST API until `POST /shutdown`
//! or Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! LESSON_AUDIT_CONFIG=lesson-audit.toml cargo run --bin lesson-audit-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8060)
//! - `LESSON_AUDIT_CONFIG`: Path of the TOML configuration file (optional)
//! - `REPOSITORY_TYPE`: Roster storage (`file` or `local`), overrides the config file
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lesson_audit::config::AppConfig;
use lesson_audit::db::RepositoryFactory;
use lesson_audit::http::{create_router, AppState};
use lesson_audit::ingest::{GroupLessonCache, IndividualScheduleParser, LessonIngestor, PortalClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting lesson audit server");

    let config_path = env::var("LESSON_AUDIT_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    let repository = RepositoryFactory::from_config(&config)
        .context("Failed to initialize roster repository")?;
    info!("Roster repository initialized");

    let input_dir = config
        .ingest
        .resolve_input_dir()
        .context("Failed to resolve spreadsheet directory")?;
    info!("Individual schedules are read from {}", input_dir.display());

    let ingestor = LessonIngestor::new(
        Arc::new(PortalClient::new(config.portal.clone())),
        Arc::new(IndividualScheduleParser::new(input_dir)),
        Arc::new(GroupLessonCache::new(config.ingest.cache_ttl())),
    );

    let state = AppState::new(repository, ingestor);
    let shutdown = Arc::clone(&state.shutdown);
    let app = create_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8060);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown.notified() => info!("Shutdown endpoint called"),
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C"),
            }
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
