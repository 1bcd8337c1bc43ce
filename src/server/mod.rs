//! Scoring service
//!
//! A thin HTTP layer over [`ScoringFacade`]. Each scoring call runs on the
//! blocking pool under a per-call timeout; the facade is shared read-only.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{BatchItem, BatchScoreRequest, ScoreRequest, ScoreResponse};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::inference::{ScoringFacade, ServingConfig};

/// Serve `facade` until ctrl+c
pub async fn run_server(facade: ScoringFacade, config: ServingConfig) -> anyhow::Result<()> {
    config.validate()?;
    let fit_id = facade.bundle().fit_id();
    let state = Arc::new(AppState::new(facade, config.clone()));
    let start_time = state.started_at;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        fit_id = %fit_id,
        timeout_ms = config.request_timeout_ms,
        threshold = config.classification_threshold,
        started_at = %start_time.to_rfc3339(),
        "Scoring service starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Listening (press ctrl+c to stop)");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c, serving until killed");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
