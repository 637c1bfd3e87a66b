pub mod logger;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("config error: {0}")]
    ConfigError(#[from] ::config::ConfigError),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    TomlError(#[from] toml::ser::Error),
}

pub type ShelfResult<T> = Result<T, ShelfError>;
