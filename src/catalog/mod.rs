pub mod openlibrary;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::ShelfResult;

pub use openlibrary::OpenLibraryClient;

/// One raw hit from a remote catalog. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDoc {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "author_name")]
    pub author_names: Option<Vec<String>>,
}

/// Read-only free-text lookup against an external book catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn search(&self, query: &str) -> ShelfResult<Vec<CatalogDoc>>;
}
