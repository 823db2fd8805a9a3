pub mod filters;
pub mod library;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ::library::Library;

use crate::state::{AppState, ErrorResponse, HealthResponse, LibraryStatus};
use crate::utils::{json_error, json_error_response};

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/library/status", get(library::get_status))
        .route("/items/filters", get(filters::get_legacy_filters))
        .route("/items/filters2", get(filters::get_query_filters))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> Response {
    json_error_response(StatusCode::NOT_FOUND, "not found")
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub(crate) fn library_or_json_error(
    state: &AppState,
) -> Result<Library, (StatusCode, Json<ErrorResponse>)> {
    let guard = state.library_state.read();
    if let Some(library) = guard.library.clone() {
        Ok(library)
    } else {
        Err(json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            library_status_message(&guard.status),
        ))
    }
}

pub(crate) fn library_status_message(status: &LibraryStatus) -> String {
    match status {
        LibraryStatus::Unconfigured => "library not loaded".to_string(),
        LibraryStatus::Loading { .. } => "library loading in progress".to_string(),
        LibraryStatus::Ready(_) => "library ready".to_string(),
        LibraryStatus::Error(message) => format!("library error: {}", message),
    }
}
