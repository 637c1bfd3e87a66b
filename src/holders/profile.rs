use std::sync::Arc;

use tokio::sync::watch;
use tracing::error;

use crate::holders::{Observable, TaskGuard};
use crate::service::BookRepository;
use crate::storage::ReadingStats;
use crate::utils::ShelfResult;

pub const DEFAULT_READING_GOAL: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileState {
    pub total_books: u32,
    pub finished_books: u32,
    pub in_progress_books: u32,
    pub is_loading: bool,
    /// Yearly target; session-local, never persisted.
    pub reading_goal: u32,
}

impl ProfileState {
    fn with_goal(reading_goal: u32) -> Self {
        Self {
            total_books: 0,
            finished_books: 0,
            in_progress_books: 0,
            is_loading: true,
            reading_goal: reading_goal.max(1),
        }
    }

    /// Finished books over the goal, for a progress bar.
    pub fn goal_progress(&self) -> f64 {
        let goal = self.reading_goal.max(1) as f64;
        (self.finished_books as f64 / goal).clamp(0.0, 1.0)
    }

    fn apply(&mut self, stats: ReadingStats) {
        self.total_books = stats.total;
        self.finished_books = stats.finished;
        self.in_progress_books = stats.in_progress;
        self.is_loading = false;
    }
}

impl Default for ProfileState {
    fn default() -> Self {
        Self::with_goal(DEFAULT_READING_GOAL)
    }
}

pub struct ProfileHolder {
    repo: BookRepository,
    state: Arc<watch::Sender<ProfileState>>,
    _task: TaskGuard,
}

impl ProfileHolder {
    /// Refreshes stats now and after every store change.
    pub fn spawn(repo: BookRepository, reading_goal: u32) -> Self {
        let (state, _) = watch::channel(ProfileState::with_goal(reading_goal));
        let state = Arc::new(state);

        let task = TaskGuard::spawn({
            let repo = repo.clone();
            let state = state.clone();
            async move {
                let mut changes = repo.database().subscribe();
                loop {
                    changes.borrow_and_update();
                    match repo.reading_stats().await {
                        Ok(stats) => state.send_modify(|s| s.apply(stats)),
                        Err(e) => error!("reading stats failed: {}", e),
                    }
                    if changes.changed().await.is_err() {
                        break;
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

    pub async fn refresh_stats(&self) -> ShelfResult<ReadingStats> {
        let stats = self.repo.reading_stats().await?;
        self.state.send_modify(|s| s.apply(stats));
        Ok(stats)
    }

    /// Floors at one book.
    pub fn update_reading_goal(&self, goal: i64) {
        let goal = goal.clamp(1, u32::MAX as i64) as u32;
        self.state.send_modify(|s| s.reading_goal = goal);
    }
}

impl Observable for ProfileHolder {
    type State = ProfileState;

    fn sender(&self) -> &watch::Sender<ProfileState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::holders::tests::settle;
    use crate::service::tests::{temp_repository, StubCatalog};

    #[test]
    fn goal_ratio_is_clamped() {
        let mut state = ProfileState::default();
        state.finished_books = 3;
        assert!((state.goal_progress() - 0.25).abs() < 1e-9);

        state.finished_books = 40;
        assert_eq!(state.goal_progress(), 1.0);

        state.finished_books = 0;
        assert_eq!(state.goal_progress(), 0.0);
    }

    #[tokio::test]
    async fn stats_load_from_store() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        repo.ensure_sample_data().await.unwrap();

        let holder = ProfileHolder::spawn(repo, DEFAULT_READING_GOAL);
        let mut rx = holder.subscribe();
        let state = settle(&mut rx, |s| !s.is_loading).await;

        assert_eq!(state.total_books, 4);
        assert_eq!(state.finished_books, 1);
        assert_eq!(state.in_progress_books, 3);
        assert_eq!(state.reading_goal, 12);
    }

    #[tokio::test]
    async fn goal_floors_at_one_and_survives_refresh() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        repo.ensure_sample_data().await.unwrap();
        let holder = ProfileHolder::spawn(repo.clone(), 0);
        assert_eq!(holder.state().reading_goal, 1);

        holder.update_reading_goal(-5);
        assert_eq!(holder.state().reading_goal, 1);

        holder.update_reading_goal(2);
        let stats = holder.refresh_stats().await.unwrap();
        assert_eq!(stats.finished, 1);

        let state = holder.state();
        assert_eq!(state.reading_goal, 2);
        assert!((state.goal_progress() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn store_changes_refresh_stats() {
        let (_dir, repo) = temp_repository(Arc::new(StubCatalog::with_docs(vec![]))).await;
        let holder = ProfileHolder::spawn(repo.clone(), DEFAULT_READING_GOAL);
        let mut rx = holder.subscribe();
        settle(&mut rx, |s| !s.is_loading).await;

        let id = repo.add_book("Educated", "Tara Westover", 5.0).await.unwrap();
        repo.update_progress(id, 1.0).await.unwrap();

        let state = settle(&mut rx, |s| s.finished_books == 1).await;
        assert_eq!(state.total_books, 1);
    }
}
