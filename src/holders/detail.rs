use std::sync::Arc;

use tokio::sync::watch;
use tracing::error;

use crate::holders::{step_progress, Observable, TaskGuard};
use crate::service::BookRepository;
use crate::storage::{clamp_progress, Book};
use crate::utils::ShelfResult;

#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub is_loading: bool,
    /// `None` once loaded means the book does not exist.
    pub book: Option<Book>,
}

impl Default for DetailState {
    fn default() -> Self {
        Self {
            is_loading: true,
            book: None,
        }
    }
}

pub struct DetailHolder {
    repo: BookRepository,
    state: Arc<watch::Sender<DetailState>>,
    _task: TaskGuard,
}

impl DetailHolder {
    pub fn spawn(repo: BookRepository, book_id: i64) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        let state = Arc::new(state);

        let task = TaskGuard::spawn({
            let mut watch = repo.watch_book(book_id);
            let state = state.clone();
            async move {
                while let Some(result) = watch.next().await {
                    match result {
                        Ok(book) => {
                            state.send_replace(DetailState {
                                is_loading: false,
                                book,
                            });
                        }
                        Err(e) => error!("book {} query failed: {}", book_id, e),
                    }
                }
            }
        });

        Self {
            repo,
            state,
            _task: task,
        }
    }

    fn current(&self) -> Option<Book> {
        self.state.borrow().book.clone()
    }

    pub async fn increase_progress(&self) -> ShelfResult<()> {
        let Some(book) = self.current() else {
            return Ok(());
        };
        self.repo.update_progress(book.id, step_progress(book.progress)).await
    }

    pub async fn set_progress(&self, fraction: f64) -> ShelfResult<()> {
        let Some(book) = self.current() else {
            return Ok(());
        };
        self.repo.update_progress(book.id, clamp_progress(fraction)).await
    }

    pub async fn update_rating_and_review(&self, rating: f64, review: &str) -> ShelfResult<()> {
        let Some(book) = self.current() else {
            return Ok(());
        };
        self.repo.update_rating_and_review(book.id, rating, review).await
    }
}

impl Observable for DetailHolder {
    type State = DetailState;

    fn sender(&self) -> &watch::Sender<DetailState> {
        &self.state
    }
}
