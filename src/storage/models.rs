use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Progress at or above this counts as finished, absorbing float rounding.
pub const FINISHED_THRESHOLD: f64 = 0.99;
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub rating: f64,
    pub progress: f64,
    pub in_shelf: bool,
    pub review: String,
    pub created_at: Option<String>,
}

impl Book {
    /// A search hit from the remote catalog: no identity, not on the shelf.
    pub fn candidate(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            author: author.into(),
            rating: 0.0,
            progress: 0.0,
            in_shelf: false,
            review: String::new(),
            created_at: None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.id == 0 || !self.in_shelf
    }

    pub fn is_finished(&self) -> bool {
        self.progress >= FINISHED_THRESHOLD
    }

    pub fn is_in_progress(&self) -> bool {
        self.progress > 0.0 && self.progress < FINISHED_THRESHOLD
    }
}

/// Record to insert; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub rating: f64,
    pub progress: f64,
    pub in_shelf: bool,
    pub review: String,
}

impl NewBook {
    pub fn shelved(title: impl Into<String>, author: impl Into<String>, rating: f64) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            rating: clamp_rating(rating),
            progress: 0.0,
            in_shelf: true,
            review: String::new(),
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = clamp_progress(progress);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingStats {
    pub total: u32,
    pub finished: u32,
    pub in_progress: u32,
}

pub fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

pub fn clamp_rating(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_RATING)
}
