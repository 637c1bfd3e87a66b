pub mod catalog;
pub mod config;
pub mod holders;
pub mod service;
pub mod storage;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use crate::catalog::{CatalogDoc, CatalogLookup, OpenLibraryClient};
pub use crate::config::{AppConfig, SearchMode};
pub use crate::service::BookRepository;
pub use crate::storage::{Book, Database, ReadingStats};
pub use crate::utils::{ShelfError, ShelfResult};

/// Opens the configured store, brings its schema up to date and wires the
/// Open Library client into a repository.
pub async fn open_repository(config: &AppConfig) -> ShelfResult<BookRepository> {
    if let Some(parent) = Path::new(&config.storage.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let db = Database::new(&config.database_url()).await?;
    db.init_schema().await?;

    let catalog = OpenLibraryClient::new(&config.catalog)?;
    info!("search mode: {:?}", config.search.mode);

    Ok(BookRepository::new(db, Arc::new(catalog))
        .with_search_mode(config.search.mode)
        .with_max_results(config.catalog.max_results))
}
