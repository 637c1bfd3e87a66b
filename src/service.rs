use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::{CatalogDoc, CatalogLookup};
use crate::config::SearchMode;
use crate::storage::{clamp_progress, clamp_rating, Book, BookWatch, Database, NewBook, ReadingStats, ShelfWatch};
use crate::utils::ShelfResult;

pub const MAX_REMOTE_RESULTS: usize = 20;
pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// Single point of mediation between the book store and the remote catalog.
#[derive(Clone)]
pub struct BookRepository {
    db: Database,
    catalog: Arc<dyn CatalogLookup>,
    mode: SearchMode,
    max_results: usize,
}

impl BookRepository {
    pub fn new(db: Database, catalog: Arc<dyn CatalogLookup>) -> Self {
        Self {
            db,
            catalog,
            mode: SearchMode::Remote,
            max_results: MAX_REMOTE_RESULTS,
        }
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Lowers the remote cap; values above `MAX_REMOTE_RESULTS` are ignored.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.min(MAX_REMOTE_RESULTS);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn shelf_books(&self) -> ShelfResult<Vec<Book>> {
        self.db.shelf_books().await
    }

    pub fn watch_shelf(&self) -> ShelfWatch {
        ShelfWatch::new(self.db.clone())
    }

    pub async fn book(&self, id: i64) -> ShelfResult<Option<Book>> {
        self.db.book_by_id(id).await
    }

    pub fn watch_book(&self, id: i64) -> BookWatch {
        BookWatch::new(self.db.clone(), id)
    }

    /// Blank queries return the shelf untouched. Remote failures are logged
    /// and collapse to an empty list; store failures still propagate.
    pub async fn search(&self, keyword: &str) -> ShelfResult<Vec<Book>> {
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            return self.db.shelf_books().await;
        }

        match self.mode {
            SearchMode::Local => self.db.search_shelf(trimmed).await,
            SearchMode::Remote => Ok(self.search_remote(trimmed).await),
        }
    }

    async fn search_remote(&self, query: &str) -> Vec<Book> {
        match self.catalog.search(query).await {
            Ok(docs) => {
                let books = docs
                    .into_iter()
                    .take(self.max_results)
                    .map(candidate_from_doc)
                    .collect::<Vec<_>>();
                debug!("remote search '{}' mapped {} candidates", query, books.len());
                books
            }
            Err(e) => {
                warn!("remote search '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }

    pub async fn add_book(&self, title: &str, author: &str, rating: f64) -> ShelfResult<i64> {
        let id = self.db.insert_book(&NewBook::shelved(title, author, rating)).await?;
        info!("added '{}' by {} to shelf (id {})", title, author, id);
        Ok(id)
    }

    pub async fn update_progress(&self, id: i64, progress: f64) -> ShelfResult<()> {
        if !self.db.update_progress(id, clamp_progress(progress)).await? {
            debug!("progress update for missing book {}", id);
        }
        Ok(())
    }

    pub async fn update_rating_and_review(&self, id: i64, rating: f64, review: &str) -> ShelfResult<()> {
        if !self.db.update_rating_and_review(id, clamp_rating(rating), review).await? {
            debug!("rating update for missing book {}", id);
        }
        Ok(())
    }

    pub async fn delete_book(&self, id: i64) -> ShelfResult<bool> {
        self.db.delete_book(id).await
    }

    /// Three independent counts; not a consistent snapshot under concurrent writes.
    pub async fn reading_stats(&self) -> ShelfResult<ReadingStats> {
        let total = self.db.count().await?;
        let finished = self.db.finished_count().await?;
        let in_progress = self.db.in_progress_count().await?;

        Ok(ReadingStats {
            total,
            finished,
            in_progress,
        })
    }

    /// Seeds the sample shelf when the store is empty. Returns whether it did.
    pub async fn ensure_sample_data(&self) -> ShelfResult<bool> {
        let inserted = self.db.insert_if_empty(&sample_books()).await?;
        if inserted > 0 {
            info!("seeded sample shelf ({} books)", inserted);
        }
        Ok(inserted > 0)
    }
}

fn candidate_from_doc(doc: CatalogDoc) -> Book {
    let title = doc.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let author = doc
        .author_names
        .and_then(|names| names.into_iter().next())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    Book::candidate(title, author)
}

fn sample_books() -> Vec<NewBook> {
    vec![
        NewBook::shelved("The Great Gatsby", "F. Scott Fitzgerald", 4.2).with_progress(0.75),
        NewBook::shelved("To Kill a Mockingbird", "Harper Lee", 4.8).with_progress(1.0),
        NewBook::shelved("1984", "George Orwell", 4.6).with_progress(0.9),
        NewBook::shelved("Dune", "Frank Herbert", 4.3).with_progress(0.25),
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::storage::database::tests::temp_database;
    use crate::utils::ShelfError;

    /// Canned catalog that counts how often it is asked.
    pub(crate) struct StubCatalog {
        docs: Vec<CatalogDoc>,
        fail: bool,
        pub(crate) calls: AtomicUsize,
    }

    impl StubCatalog {
        pub(crate) fn with_docs(docs: Vec<CatalogDoc>) -> Self {
            Self {
                docs,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                docs: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogLookup for StubCatalog {
        async fn search(&self, _query: &str) -> ShelfResult<Vec<CatalogDoc>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ShelfError::ParseError("stub failure".to_string()));
            }
            Ok(self.docs.clone())
        }
    }

    pub(crate) fn doc(title: Option<&str>, authors: Option<Vec<&str>>) -> CatalogDoc {
        CatalogDoc {
            title: title.map(str::to_string),
            author_names: authors.map(|names| names.iter().map(|n| n.to_string()).collect()),
        }
    }

    pub(crate) async fn temp_repository(catalog: Arc<StubCatalog>) -> (tempfile::TempDir, BookRepository) {
        let (dir, db) = temp_database().await;
        (dir, BookRepository::new(db, catalog))
    }

    #[tokio::test]
    async fn sample_data_stats_match_thresholds() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        assert!(repo.ensure_sample_data().await.unwrap());

        let stats = repo.reading_stats().await.unwrap();
        assert_eq!(
            stats,
            ReadingStats {
                total: 4,
                finished: 1,
                in_progress: 3,
            }
        );
    }

    #[tokio::test]
    async fn ensure_sample_data_is_idempotent() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        assert!(repo.ensure_sample_data().await.unwrap());
        assert!(!repo.ensure_sample_data().await.unwrap());

        assert_eq!(repo.shelf_books().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn ensure_sample_data_leaves_existing_rows_alone() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        repo.add_book("Mine", "Me", 1.0).await.unwrap();

        assert!(!repo.ensure_sample_data().await.unwrap());
        let shelf = repo.shelf_books().await.unwrap();
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].title, "Mine");
    }

    #[tokio::test]
    async fn added_book_lands_on_shelf_unread() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        let id = repo.add_book("X", "Y", 4.0).await.unwrap();

        let shelf = repo.shelf_books().await.unwrap();
        let book = shelf.iter().find(|b| b.id == id).unwrap();
        assert_eq!(book.progress, 0.0);
        assert_eq!(book.rating, 4.0);
        assert!(book.in_shelf);
        assert!(!book.is_transient());
    }

    #[tokio::test]
    async fn blank_query_returns_shelf_without_lookup() {
        let catalog = Arc::new(StubCatalog::with_docs(vec![doc(Some("Remote"), None)]));
        let (_dir, repo) = temp_repository(catalog.clone()).await;
        repo.ensure_sample_data().await.unwrap();

        let shelf = repo.shelf_books().await.unwrap();
        assert_eq!(repo.search("").await.unwrap(), shelf);
        assert_eq!(repo.search("   \t").await.unwrap(), shelf);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_results_are_capped_and_placeholdered() {
        let mut docs = vec![
            doc(None, Some(vec!["Anon"])),
            doc(Some("No Author"), None),
            doc(Some("Empty Authors"), Some(vec![])),
            doc(Some("Good Omens"), Some(vec!["Terry Pratchett", "Neil Gaiman"])),
        ];
        docs.extend((0..30).map(|i| doc(Some(&format!("Filler {}", i)), Some(vec!["X"]))));
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(docs))).await;

        let results = repo.search("  omens ").await.unwrap();
        assert_eq!(results.len(), MAX_REMOTE_RESULTS);
        assert_eq!(results[0].title, UNKNOWN_TITLE);
        assert_eq!(results[0].author, "Anon");
        assert_eq!(results[1].author, UNKNOWN_AUTHOR);
        assert_eq!(results[2].author, UNKNOWN_AUTHOR);
        assert_eq!(results[3].author, "Terry Pratchett");
        assert!(results.iter().all(Book::is_transient));
        assert!(results.iter().all(|b| b.id == 0 && !b.in_shelf));
    }

    #[tokio::test]
    async fn remote_failure_collapses_to_empty() {
        let catalog = Arc::new(StubCatalog::failing());
        let (_dir, repo) = temp_repository(catalog.clone()).await;
        repo.ensure_sample_data().await.unwrap();

        assert!(repo.search("dune").await.unwrap().is_empty());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_mode_searches_shelf_only() {
        let catalog = Arc::new(StubCatalog::with_docs(vec![doc(Some("Remote"), None)]));
        let (_dir, repo) = temp_repository(catalog.clone()).await;
        let repo = repo.with_search_mode(SearchMode::Local);
        repo.ensure_sample_data().await.unwrap();

        let results = repo.search("the").await.unwrap();
        let titles: Vec<_> = results.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["The Great Gatsby"]);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn progress_and_rating_are_clamped() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        let id = repo.add_book("X", "Y", 0.0).await.unwrap();

        repo.update_progress(id, 3.5).await.unwrap();
        repo.update_rating_and_review(id, 7.0, "great").await.unwrap();

        let book = repo.book(id).await.unwrap().unwrap();
        assert_eq!(book.progress, 1.0);
        assert_eq!(book.rating, 5.0);
        assert_eq!(book.review, "great");
    }

    #[tokio::test]
    async fn updates_on_missing_book_are_silent() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        repo.update_progress(404, 0.5).await.unwrap();
        repo.update_rating_and_review(404, 3.0, "").await.unwrap();
        assert!(repo.book(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_partition_never_exceeds_total() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        for (i, progress) in [0.0, 0.0, 0.5, 0.98, 0.99, 1.0].into_iter().enumerate() {
            let id = repo.add_book(&format!("B{}", i), "A", 0.0).await.unwrap();
            repo.update_progress(id, progress).await.unwrap();
        }

        let stats = repo.reading_stats().await.unwrap();
        assert_eq!(stats.total, 6);
        assert_eq!(stats.finished, 2);
        assert_eq!(stats.in_progress, 2);
        assert!(stats.finished + stats.in_progress <= stats.total);
    }

    #[tokio::test]
    async fn configured_cap_never_exceeds_twenty() {
        let docs = (0..30).map(|i| doc(Some(&format!("Hit {}", i)), None)).collect();
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(docs))).await;

        let wide = repo.clone().with_max_results(50);
        assert_eq!(wide.search("x").await.unwrap().len(), MAX_REMOTE_RESULTS);

        let narrow = repo.with_max_results(5);
        assert_eq!(narrow.search("x").await.unwrap().len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_seeding_inserts_one_set() {
        for _ in 0..8 {
            let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;

            let (first, second) = tokio::join!(repo.ensure_sample_data(), repo.ensure_sample_data());
            let seeded = [first.unwrap(), second.unwrap()];

            assert_eq!(seeded.iter().filter(|s| **s).count(), 1);
            assert_eq!(repo.reading_stats().await.unwrap().total, 4);
        }
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        repo.database().pool().close().await;

        assert!(matches!(
            repo.add_book("X", "Y", 1.0).await.unwrap_err(),
            ShelfError::DatabaseError(_)
        ));
        assert!(matches!(
            repo.reading_stats().await.unwrap_err(),
            ShelfError::DatabaseError(_)
        ));
        assert!(matches!(
            repo.ensure_sample_data().await.unwrap_err(),
            ShelfError::DatabaseError(_)
        ));
    }
}
