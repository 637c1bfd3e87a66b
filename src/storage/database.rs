use std::sync::Arc;

use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::storage::models::{clamp_progress, clamp_rating, Book, NewBook, FINISHED_THRESHOLD};
use crate::utils::ShelfResult;

/// Bumped whenever the `books` layout changes; a mismatch drops the table.
pub const SCHEMA_VERSION: i64 = 2;

const BOOK_COLUMNS: &str = "id, title, author, rating, progress, in_shelf, review, created_at";

/// Handle to the book store. Cheap to clone; every clone shares the pool and
/// the change feed.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl Database {
    /// Connects to the SQLite file, creating it when missing.
    pub async fn new(database_url: &str) -> ShelfResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                database_url
                    .parse::<sqlx::sqlite::SqliteConnectOptions>()?
                    .create_if_missing(true),
            )
            .await?;

        info!("database connected: {}", database_url);
        let (changes, _) = watch::channel(0);
        Ok(Self {
            pool,
            changes: Arc::new(changes),
        })
    }

    /// Creates tables, dropping `books` when the stored schema version differs.
    pub async fn init_schema(&self) -> ShelfResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let stored = sqlx::query_scalar::<_, String>("SELECT value FROM meta WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?
            .and_then(|value| value.parse::<i64>().ok());

        if stored != Some(SCHEMA_VERSION) {
            if let Some(old) = stored {
                warn!("schema version {} != {}, dropping books table", old, SCHEMA_VERSION);
            }
            sqlx::query("DROP TABLE IF EXISTS books")
                .execute(&self.pool)
                .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                rating REAL NOT NULL DEFAULT 0,
                progress REAL NOT NULL DEFAULT 0,
                in_shelf INTEGER NOT NULL DEFAULT 1,
                review TEXT NOT NULL DEFAULT '',
                created_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES ('schema_version', ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(SCHEMA_VERSION.to_string())
        .execute(&self.pool)
        .await?;

        info!("schema ready (version {})", SCHEMA_VERSION);
        self.notify();
        Ok(())
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Receiver that observes a new revision after every successful write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    /// Inserts one record and returns its new id.
    pub async fn insert_book(&self, book: &NewBook) -> ShelfResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (title, author, rating, progress, in_shelf, review, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(clamp_rating(book.rating))
        .bind(clamp_progress(book.progress))
        .bind(book.in_shelf)
        .bind(&book.review)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("inserted book {} ({})", id, book.title);
        self.notify();
        Ok(id)
    }

    /// Inserts `books` only while the table is empty, as one statement so
    /// concurrent callers cannot both seed. Returns the number of rows written.
    pub async fn insert_if_empty(&self, books: &[NewBook]) -> ShelfResult<u64> {
        if books.is_empty() {
            return Ok(0);
        }

        let rows = vec!["(?, ?, ?, ?, ?, ?, ?)"; books.len()].join(", ");
        let sql = format!(
            r#"
            INSERT INTO books (title, author, rating, progress, in_shelf, review, created_at)
            SELECT * FROM (VALUES {})
            WHERE NOT EXISTS (SELECT 1 FROM books)
            "#,
            rows
        );

        let created_at = Utc::now().to_rfc3339();
        let mut query = sqlx::query(&sql);
        for book in books {
            query = query
                .bind(&book.title)
                .bind(&book.author)
                .bind(clamp_rating(book.rating))
                .bind(clamp_progress(book.progress))
                .bind(book.in_shelf)
                .bind(&book.review)
                .bind(created_at.clone());
        }

        let inserted = query.execute(&self.pool).await?.rows_affected();
        if inserted > 0 {
            debug!("inserted {} rows into empty store", inserted);
            self.notify();
        }
        Ok(inserted)
    }

    /// Shelf rows, newest first.
    pub async fn shelf_books(&self) -> ShelfResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE in_shelf = 1 ORDER BY id DESC",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Case-insensitive substring match on title or author, ordered by title.
    pub async fn search_shelf(&self, keyword: &str) -> ShelfResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM books
            WHERE in_shelf = 1
              AND (instr(lower(title), lower(?)) > 0 OR instr(lower(author), lower(?)) > 0)
            ORDER BY title COLLATE NOCASE, id
            "#,
            BOOK_COLUMNS
        ))
        .bind(keyword)
        .bind(keyword)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// One record by id, shelf or not.
    pub async fn book_by_id(&self, id: i64) -> ShelfResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = ? LIMIT 1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Returns whether a row was touched; a missing id is not an error.
    pub async fn update_progress(&self, id: i64, progress: f64) -> ShelfResult<bool> {
        let result = sqlx::query("UPDATE books SET progress = ? WHERE id = ?")
            .bind(clamp_progress(progress))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(self.touched(result.rows_affected()))
    }

    /// Rating is clamped, review stored verbatim. Returns whether a row was touched.
    pub async fn update_rating_and_review(&self, id: i64, rating: f64, review: &str) -> ShelfResult<bool> {
        let result = sqlx::query("UPDATE books SET rating = ?, review = ? WHERE id = ?")
            .bind(clamp_rating(rating))
            .bind(review)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(self.touched(result.rows_affected()))
    }

    /// Removes one record. Returns whether it existed.
    pub async fn delete_book(&self, id: i64) -> ShelfResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(self.touched(result.rows_affected()))
    }

    fn touched(&self, rows: u64) -> bool {
        if rows > 0 {
            self.notify();
        }
        rows > 0
    }

    /// All records, shelf or not.
    pub async fn count(&self) -> ShelfResult<u32> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(saturate(count))
    }

    /// Records at or above the finished threshold.
    pub async fn finished_count(&self) -> ShelfResult<u32> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books WHERE progress >= ?")
            .bind(FINISHED_THRESHOLD)
            .fetch_one(&self.pool)
            .await?;

        Ok(saturate(count))
    }

    /// Started records below the finished threshold.
    pub async fn in_progress_count(&self) -> ShelfResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM books WHERE progress > 0 AND progress < ?",
        )
        .bind(FINISHED_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        Ok(saturate(count))
    }
}

fn saturate(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}
