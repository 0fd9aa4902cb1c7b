//! HTTP route handlers for the chat relay API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::handler::HandlerWithoutStateExt;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::services::ServeDir;
use tracing::Instrument;
use uuid::Uuid;

use super::response::{ApiError, ApiResponse};
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // `/` resolves to `index.html`; misses fall through to the JSON 404.
    let assets = ServeDir::new(&state.static_dir).not_found_service(not_found.into_service());
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/reset", post(reset))
        .route_service("/", assets.clone())
        .nest_service("/static", assets)
        .fallback(not_found)
        .layer(body_limit)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chat-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "conversations": state.chat.store().len(),
    }))
}

/// Handle chat requests.
async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let body = body?;
    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4());
    let reply = state.chat.chat(&body).instrument(span).await?;
    Ok(Json(ApiResponse::with_message(reply)))
}

/// Handle conversation resets.
async fn reset(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let body = body?;
    state.chat.reset(&body)?;
    Ok(Json(ApiResponse::ok()))
}

/// JSON 404 for unmatched routes.
async fn not_found() -> ApiError {
    ApiError::not_found()
}
