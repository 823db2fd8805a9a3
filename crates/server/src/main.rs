mod api;
mod config;
mod index;
mod state;
mod utils;

use std::sync::Arc;

use axum::Router;
use api::api_router;
use config::{config_path_from_env, load_or_create_config, resolve_catalog_path, resolve_path};
use index::start_load;
use library::Library;
use parking_lot::RwLock;
use state::{AppState, LibraryState, LibraryStatus};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let index_path = resolve_path(&config_path, config.index_path.trim());
    let db = Library::open_db(&index_path)?;
    let bind_addr = config.listen_addr();
    let catalog = resolve_catalog_path(&config_path, &config.catalog_path);

    let library_state = Arc::new(RwLock::new(LibraryState {
        library: None,
        status: LibraryStatus::Unconfigured,
    }));
    let state = AppState { library_state, db };
    match &catalog {
        Some(path) if !path.exists() => {
            warn!("Catalog {:?} not found; serving the existing index only", path);
            start_load(state.clone(), None);
        }
        _ => start_load(state.clone(), catalog),
    }

    let app = Router::new()
        .nest("/api/v1", api_router(state.clone()))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
