//! Startup helpers for the chat relay server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::conversation::eviction::IdleEviction;
use crate::server::{self, AppState};

/// Run the relay until Ctrl-C (used by the `chat-relay` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("Starting chat relay v{}", env!("CARGO_PKG_VERSION"));

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    if config.provider.api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; chat requests will answer 503");
    }
    tracing::info!(provider = ?config.provider, "Completion provider");

    let state = match initialize(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        let eviction = IdleEviction::new(state.store(), config.eviction.clone());
        let stop_eviction = eviction.shutdown_notifier();
        let worker = eviction.spawn();

        let served = server::run_server_with_shutdown(state, config.port, shutdown_signal()).await;

        stop_eviction.notify_one();
        if let Err(e) = worker.await {
            tracing::warn!("Eviction worker ended abnormally: {e}");
        }
        served
    });

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Chat relay stopped");
    ExitCode::SUCCESS
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub fn initialize(config: &RelayConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    AppState::new(config).map_err(|e| format!("Failed to create completion client: {e}").into())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
