pub mod database;
pub mod live;
pub mod models;

pub use database::{Database, SCHEMA_VERSION};
pub use live::{BookWatch, ShelfWatch};
pub use models::{clamp_progress, clamp_rating, Book, NewBook, ReadingStats};
