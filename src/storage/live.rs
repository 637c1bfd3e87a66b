//! Continuously-updated queries over the book store.
//!
//! A watch yields the current result on its first `next()` call and then
//! once per store revision. Bursts of writes between two `next()` calls are
//! coalesced into a single re-query.

use tokio::sync::watch;

use crate::storage::{Book, Database};
use crate::utils::ShelfResult;

struct ChangeFeed {
    changes: watch::Receiver<u64>,
    primed: bool,
}

impl ChangeFeed {
    fn new(db: &Database) -> Self {
        Self {
            changes: db.subscribe(),
            primed: false,
        }
    }

    /// Resolves when the caller should re-query; `false` once the store is gone.
    async fn ready(&mut self) -> bool {
        if !self.primed {
            self.primed = true;
            self.changes.borrow_and_update();
            return true;
        }
        self.changes.changed().await.is_ok()
    }
}

pub struct ShelfWatch {
    db: Database,
    feed: ChangeFeed,
}

impl ShelfWatch {
    pub fn new(db: Database) -> Self {
        let feed = ChangeFeed::new(&db);
        Self { db, feed }
    }

    pub async fn next(&mut self) -> Option<ShelfResult<Vec<Book>>> {
        if !self.feed.ready().await {
            return None;
        }
        Some(self.db.shelf_books().await)
    }
}

pub struct BookWatch {
    db: Database,
    id: i64,
    feed: ChangeFeed,
}

impl BookWatch {
    pub fn new(db: Database, id: i64) -> Self {
        let feed = ChangeFeed::new(&db);
        Self { db, id, feed }
    }

    pub async fn next(&mut self) -> Option<ShelfResult<Option<Book>>> {
        if !self.feed.ready().await {
            return None;
        }
        Some(self.db.book_by_id(self.id).await)
    }
}
