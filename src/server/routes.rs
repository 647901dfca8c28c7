use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::Stream;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::live::{ConfigStore, LiveReceiver};
use crate::race::model::StrategyInput;
use crate::server::api::{self, ApiDefaults, ApiError, EvaluateResponse, RankResponse, ValidationErrorResponse};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub defaults: ApiDefaults,
    pub live: LiveReceiver,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/config", get(get_config).put(put_config))
        .route("/api/rank", post(rank))
        .route("/api/evaluate", post(evaluate))
        .route("/api/live", get(live))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Parse(err) => error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {err}"),
            ),
            Self::Validation(validation) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationErrorResponse::from(validation)),
            )
                .into_response(),
            Self::Internal(message) => {
                error!("request failed: {message}");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "status": "error", "message": message })),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(api::health_payload())
}

async fn get_config(State(state): State<AppState>) -> Json<StrategyInput> {
    Json((*state.store.snapshot()).clone())
}

async fn put_config(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<StrategyInput>, ApiError> {
    api::config_put_payload(&body, &state.store).map(Json)
}

async fn rank(State(state): State<AppState>, body: String) -> Result<Json<RankResponse>, ApiError> {
    run_blocking(move || api::rank_payload(&body, &state.store, &state.defaults)).await
}

async fn evaluate(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<EvaluateResponse>, ApiError> {
    run_blocking(move || api::evaluate_payload(&body, &state.store, &state.defaults)).await
}

/// Simulation is CPU-bound; keep it off the async workers.
async fn run_blocking<F, T>(work: F) -> Result<Json<T>, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map(Json)
}

/// Server-sent events: one `ranking` event per completed live pass.
async fn live(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.live)
        .filter_map(|snapshot| snapshot)
        .map(|snapshot| {
            let event = Event::default()
                .event("ranking")
                .json_data(&*snapshot)
                .unwrap_or_else(|err| Event::default().event("error").data(err.to_string()));
            Ok(event)
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
