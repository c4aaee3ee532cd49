//! Webhook service entrypoint.
//! Boots the Axum HTTP server with the LINE webhook, health and metrics routes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use daily_econ_shorts::api::{self, AppState, SpawningLauncher};
use daily_econ_shorts::bootstrap;
use daily_econ_shorts::metrics::Metrics;
use daily_econ_shorts::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    daily_econ_shorts::init_tracing();

    let cfg = AppConfig::load()?;
    bootstrap::report_config(&cfg);
    if cfg.line.channel_secret.is_empty() {
        warn!("LINE_CHANNEL_SECRET missing; every webhook call will be rejected");
    }

    let metrics = Metrics::init(cfg.pipeline.full_pipeline)?;
    let line = bootstrap::build_line(&cfg)?;
    let orchestrator = bootstrap::build_orchestrator(&cfg)?;

    let state = AppState {
        channel_secret: Arc::from(cfg.line.channel_secret.as_str()),
        messenger: line.clone(),
        launcher: Arc::new(SpawningLauncher::new(orchestrator, line)),
    };
    let app = api::router(state, Some(&metrics));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("invalid server.host/server.port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "daily-econ-shorts listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
