use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::ShelfResult;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub profile: ProfileConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

/// Where free-text searches are answered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Open Library lookup, failures collapse to an empty list.
    #[default]
    Remote,
    /// Substring match over the shelf, ordered by title.
    Local,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub search_on_change: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub default_reading_goal: u32,
}

impl AppConfig {
    pub fn load() -> ShelfResult<Self> {
        Self::load_from(PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Reads `path` if it exists, then applies `SHELF__SECTION__KEY` overrides.
    pub fn load_from(path: impl AsRef<Path>) -> ShelfResult<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("SHELF").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ShelfResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.storage.database_path)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openlibrary.org".to_string(),
            timeout_secs: 15,
            user_agent: "shelfkeeper/0.1".to_string(),
            max_results: 20,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./data/shelf.db".to_string(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            default_reading_goal: 12,
        }
    }
}
