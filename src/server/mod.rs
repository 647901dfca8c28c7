pub mod api;
pub mod routes;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::live::{ConfigStore, LiveRanker, LiveSettings};
use crate::server::api::ApiDefaults;
use crate::server::routes::{router, AppState};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Blocking entry point: builds a tokio runtime and serves until Ctrl-C.
pub fn run_server(config: AppConfig) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

pub async fn serve(config: AppConfig) -> Result<(), ServerError> {
    let store = Arc::new(ConfigStore::new(config.input.clone())?);
    let ranker = LiveRanker::spawn(Arc::clone(&store), LiveSettings::from(&config));
    let state = AppState {
        store,
        defaults: ApiDefaults::from(&config),
        live: ranker.subscribe(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        refresh_ms = config.refresh_interval_ms,
        samples = config.samples,
        "pitwall server listening on http://{}",
        config.bind
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ranker.shutdown();
    info!("pitwall server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler unavailable ({err}); serving until killed");
        std::future::pending::<()>().await;
    }
}
