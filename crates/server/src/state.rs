use std::sync::Arc;
use std::time::SystemTime;

use axum::http::StatusCode;
use axum::Json;
use parking_lot::RwLock;
use redb::Database;
use serde::{Deserialize, Serialize};

use library::{Library, LibraryStats};

#[derive(Clone)]
pub struct AppState {
    pub library_state: Arc<RwLock<LibraryState>>,
    pub db: Arc<Database>,
}

#[derive(Clone)]
pub struct LibraryState {
    pub library: Option<Library>,
    pub status: LibraryStatus,
}

#[derive(Clone, Debug)]
pub enum LibraryStatus {
    Unconfigured,
    Loading { started: SystemTime },
    Ready(LibraryStats),
    Error(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct LibraryStatusResponse {
    pub status: String,
    pub message: Option<String>,
    pub items: Option<usize>,
    pub users: Option<usize>,
    pub genres: Option<usize>,
    pub music_genres: Option<usize>,
}

/// Raw query string of both filter endpoints; values are validated by the handlers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub user_id: Option<String>,
    pub parent_id: Option<String>,
    pub include_item_types: Option<String>,
    pub is_airing: Option<String>,
    pub is_movie: Option<String>,
    pub is_sports: Option<String>,
    pub is_kids: Option<String>,
    pub is_news: Option<String>,
    pub is_series: Option<String>,
    pub recursive: Option<String>,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
