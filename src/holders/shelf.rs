use std::sync::Arc;

use rand::Rng;
use tokio::sync::watch;
use tracing::{error, warn};

use crate::holders::{step_progress, Observable, TaskGuard};
use crate::service::BookRepository;
use crate::storage::Book;
use crate::utils::ShelfResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ShelfState {
    pub is_loading: bool,
    pub books: Vec<Book>,
}

impl Default for ShelfState {
    fn default() -> Self {
        Self {
            is_loading: true,
            books: Vec::new(),
        }
    }
}

pub struct ShelfHolder {
    repo: BookRepository,
    state: Arc<watch::Sender<ShelfState>>,
    _task: TaskGuard,
}

impl ShelfHolder {
    /// Seeds the sample shelf if needed, then mirrors the shelf list.
    pub fn spawn(repo: BookRepository) -> Self {
        let (state, _) = watch::channel(ShelfState::default());
        let state = Arc::new(state);

        let task = TaskGuard::spawn({
            let repo = repo.clone();
            let state = state.clone();
            async move {
                if let Err(e) = repo.ensure_sample_data().await {
                    warn!("could not seed sample shelf: {}", e);
                }

                let mut shelf = repo.watch_shelf();
                while let Some(result) = shelf.next().await {
                    match result {
                        Ok(books) => {
                            state.send_replace(ShelfState {
                                is_loading: false,
                                books,
                            });
                        }
                        Err(e) => error!("shelf query failed: {}", e),
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

    pub async fn add_demo_book(&self) -> ShelfResult<i64> {
        let n = rand::thread_rng().gen_range(0..=999);
        self.repo.add_book(&format!("New Book {}", n), "Unknown", 4.0).await
    }

    pub async fn increase_progress(&self, book: &Book) -> ShelfResult<()> {
        self.repo.update_progress(book.id, step_progress(book.progress)).await
    }
}

impl Observable for ShelfHolder {
    type State = ShelfState;

    fn sender(&self) -> &watch::Sender<ShelfState> {
        &self.state
    }
}
