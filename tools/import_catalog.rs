use std::env;
use std::path::PathBuf;

use library::Library;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let catalog_path = args
        .next()
        .or_else(|| env::var("CATALOG_PATH").ok())
        .ok_or("CATALOG_PATH not set and no path argument")?;
    let index_path = args
        .next()
        .or_else(|| env::var("INDEX_PATH").ok())
        .unwrap_or_else(|| "data/library.redb".to_string());

    let library = Library::open(&PathBuf::from(&index_path))?;
    let stats = library.import_catalog(&PathBuf::from(&catalog_path))?;

    println!(
        "Imported: {} items, {} users, {} genres, {} music genres",
        stats.items, stats.users, stats.genres, stats.music_genres
    );

    Ok(())
}
