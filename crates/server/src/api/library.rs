use axum::{extract::State, Json};

use crate::state::{AppState, LibraryStatus, LibraryStatusResponse};

use super::library_status_message;

pub async fn get_status(State(state): State<AppState>) -> Json<LibraryStatusResponse> {
    let status = state.library_state.read().status.clone();
    let message = Some(library_status_message(&status));
    let response = match status {
        LibraryStatus::Unconfigured => LibraryStatusResponse {
            status: "unconfigured".to_string(),
            message,
            items: None,
            users: None,
            genres: None,
            music_genres: None,
        },
        LibraryStatus::Loading { started } => {
            let elapsed = started.elapsed().map(|value| value.as_secs()).unwrap_or(0);
            LibraryStatusResponse {
                status: "loading".to_string(),
                message: Some(format!("loading for {}s", elapsed)),
                items: None,
                users: None,
                genres: None,
                music_genres: None,
            }
        }
        LibraryStatus::Ready(stats) => LibraryStatusResponse {
            status: "ready".to_string(),
            message: None,
            items: Some(stats.items),
            users: Some(stats.users),
            genres: Some(stats.genres),
            music_genres: Some(stats.music_genres),
        },
        LibraryStatus::Error(_) => LibraryStatusResponse {
            status: "error".to_string(),
            message,
            items: None,
            users: None,
            genres: None,
            music_genres: None,
        },
    };
    Json(response)
}
