pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod state;
pub mod background;

use crate::background::start_background_worker;
use crate::config::Config;
use crate::infra::factory::bootstrap_state;
use crate::logging::LogSettings;
use api::router::create_router;
use std::sync::Arc;
use tracing::{info, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, draining connections");
}

pub async fn run() {
    let _guard = logging::init(&LogSettings::from_env());

    let config = Config::from_env();
    let state = Arc::new(bootstrap_state(&config).await);

    let worker = tokio::spawn(start_background_worker(state.clone()));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind listener");

    info!(port = config.port, "Server running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Jobs left unclaimed are picked up on next start.
    worker.abort();
}
