use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error};

use crate::holders::{Observable, TaskGuard};
use crate::service::BookRepository;
use crate::storage::Book;
use crate::utils::ShelfResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryState {
    pub query: String,
    pub results: Vec<Book>,
    pub is_loading: bool,
}

/// Search screen state. At most one search is in flight; a new one aborts
/// the previous, and a result from an older generation is never published.
pub struct LibraryHolder {
    repo: BookRepository,
    state: Arc<watch::Sender<LibraryState>>,
    generation: Arc<AtomicU64>,
    search: Option<TaskGuard>,
    search_on_change: bool,
}

impl LibraryHolder {
    pub fn new(repo: BookRepository) -> Self {
        let (state, _) = watch::channel(LibraryState::default());
        Self {
            repo,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            search: None,
            search_on_change: false,
        }
    }

    /// Search on every keystroke instead of only on submit.
    pub fn with_search_on_change(mut self, enabled: bool) -> Self {
        self.search_on_change = enabled;
        self
    }

    pub fn on_query_change(&mut self, query: &str) {
        self.state.send_modify(|s| s.query = query.to_string());
        if self.search_on_change {
            self.perform_search();
        }
    }

    pub fn perform_search(&mut self) {
        // drop aborts the in-flight search
        self.search.take();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let keyword = self.state.borrow().query.trim().to_string();
        if keyword.is_empty() {
            self.state.send_modify(|s| {
                s.results.clear();
                s.is_loading = false;
            });
            return;
        }

        self.state.send_modify(|s| s.is_loading = true);
        debug!("search #{} for '{}'", generation, keyword);

        let repo = self.repo.clone();
        let state = self.state.clone();
        let current = self.generation.clone();
        self.search = Some(TaskGuard::spawn(async move {
            let results = match repo.search(&keyword).await {
                Ok(results) => results,
                Err(e) => {
                    error!("search for '{}' failed: {}", keyword, e);
                    Vec::new()
                }
            };

            state.send_if_modified(|s| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                s.results = results;
                s.is_loading = false;
                true
            });
        }));
    }

    pub async fn add_to_shelf(&self, book: &Book) -> ShelfResult<i64> {
        self.repo.add_book(&book.title, &book.author, book.rating).await
    }
}

impl Observable for LibraryHolder {
    type State = LibraryState;

    fn sender(&self) -> &watch::Sender<LibraryState> {
        &self.state
    }
}
