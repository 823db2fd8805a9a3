use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{info, warn};

use crate::state::{AppState, LibraryStatus};
use library::{Library, LibraryStats};

/// Opens the index on the blocking pool, importing the catalog when the index
/// is missing or stale, and publishes the result into the shared state.
pub fn start_load(state: AppState, catalog: Option<PathBuf>) {
    {
        let mut guard = state.library_state.write();
        guard.library = None;
        guard.status = LibraryStatus::Loading {
            started: SystemTime::now(),
        };
    }

    tokio::spawn(async move {
        let db = Arc::clone(&state.db);
        let result = tokio::task::spawn_blocking(move || {
            let (library, imported) = Library::load_or_import_with_db(db, catalog.as_deref())?;
            let stats = library.stats()?;
            Ok::<(Library, LibraryStats, bool), library::LibraryError>((library, stats, imported))
        })
        .await;

        match result {
            Ok(Ok((library, stats, imported))) => {
                {
                    let mut guard = state.library_state.write();
                    guard.library = Some(library);
                    guard.status = LibraryStatus::Ready(stats.clone());
                }
                info!(
                    "Library ready{}: {} items, {} users, {} genres, {} music genres",
                    if imported { " (catalog imported)" } else { "" },
                    stats.items,
                    stats.users,
                    stats.genres,
                    stats.music_genres
                );
            }
            Ok(Err(err)) => set_library_error(&state, err.to_string(), "Library load failed"),
            Err(err) => set_library_error(&state, err.to_string(), "Library load join error"),
        }
    });
}

fn set_library_error(state: &AppState, message: String, context: &str) {
    warn!("{}: {}", context, message);
    let mut guard = state.library_state.write();
    guard.library = None;
    guard.status = LibraryStatus::Error(message);
}
