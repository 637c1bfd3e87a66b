use std::sync::Arc;

use tokio::sync::watch;
use tracing::error;

use crate::holders::{Observable, TaskGuard};
use crate::service::BookRepository;
use crate::storage::Book;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeState {
    pub continue_reading: Vec<Book>,
}

/// Started but unfinished shelf books, in shelf order.
pub fn continue_reading(books: Vec<Book>) -> Vec<Book> {
    books
        .into_iter()
        .filter(|b| b.progress > 0.0 && b.progress < 1.0)
        .collect()
}

pub struct HomeHolder {
    state: Arc<watch::Sender<HomeState>>,
    _task: TaskGuard,
}

impl HomeHolder {
    pub fn spawn(repo: BookRepository) -> Self {
        let (state, _) = watch::channel(HomeState::default());
        let state = Arc::new(state);

        let task = TaskGuard::spawn({
            let state = state.clone();
            async move {
                let mut shelf = repo.watch_shelf();
                while let Some(result) = shelf.next().await {
                    match result {
                        Ok(books) => {
                            state.send_replace(HomeState {
                                continue_reading: continue_reading(books),
                            });
                        }
                        Err(e) => error!("shelf query failed: {}", e),
                    }
                }
            }
        });

        Self { state, _task: task }
    }
}

impl Observable for HomeHolder {
    type State = HomeState;

    fn sender(&self) -> &watch::Sender<HomeState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::holders::tests::settle;
    use crate::service::tests::{temp_repository, StubCatalog};

    #[tokio::test]
    async fn filters_to_started_unfinished_books() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        repo.ensure_sample_data().await.unwrap();
        repo.add_book("Unopened", "Nobody", 0.0).await.unwrap();

        let holder = HomeHolder::spawn(repo);
        let mut rx = holder.subscribe();
        let state = settle(&mut rx, |s| !s.continue_reading.is_empty()).await;

        let titles: Vec<_> = state.continue_reading.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "1984", "The Great Gatsby"]);
    }

    #[tokio::test]
    async fn finishing_a_book_removes_it() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        let id = repo.add_book("Halfway", "A", 0.0).await.unwrap();
        repo.update_progress(id, 0.5).await.unwrap();

        let holder = HomeHolder::spawn(repo.clone());
        let mut rx = holder.subscribe();
        settle(&mut rx, |s| s.continue_reading.len() == 1).await;

        repo.update_progress(id, 1.0).await.unwrap();
        let state = settle(&mut rx, |s| s.continue_reading.is_empty()).await;
        assert!(state.continue_reading.is_empty());
    }
}
