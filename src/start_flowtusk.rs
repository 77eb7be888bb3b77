//! Startup helpers for the Flowtusk server.

use std::process::ExitCode;

use anyhow::Context;

use crate::config::AppConfig;
use crate::server::{self, AppState};

/// Run the server until Ctrl-C (used by the `flowtusk-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Flowtusk v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; generation requests will fail");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Build the state and serve until a shutdown signal arrives.
///
/// # Errors
/// Returns an error if state creation or the server fails.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::new(&config).await?;
    server::run_server_with_shutdown(state, config.server.port, shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("Shutdown signal received");
}
