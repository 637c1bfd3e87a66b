//! Per-screen view-state holders.
//!
//! Each holder publishes snapshots over a `watch` channel and owns at most a
//! few background tasks that are aborted when the holder is dropped.

pub mod community;
pub mod detail;
pub mod home;
pub mod library;
pub mod profile;
pub mod shelf;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::storage::clamp_progress;

pub use community::{Category, CategoryFilter, CommunityHolder, CommunityState, Discussion};
pub use detail::{DetailHolder, DetailState};
pub use home::{HomeHolder, HomeState};
pub use library::{LibraryHolder, LibraryState};
pub use profile::{ProfileHolder, ProfileState, DEFAULT_READING_GOAL};
pub use shelf::{ShelfHolder, ShelfState};

pub const PROGRESS_STEP: f64 = 0.1;

/// One "+10%" tap, capped at finished.
pub fn step_progress(progress: f64) -> f64 {
    clamp_progress(progress + PROGRESS_STEP)
}

pub trait Observable {
    type State: Clone;

    fn sender(&self) -> &watch::Sender<Self::State>;

    fn subscribe(&self) -> watch::Receiver<Self::State> {
        self.sender().subscribe()
    }

    fn state(&self) -> Self::State {
        self.sender().borrow().clone()
    }
}

/// Aborts the wrapped task on drop, tying it to the holder's lifetime.
pub(crate) struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
