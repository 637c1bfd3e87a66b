use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::holders::Observable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    BookRequest,
    Recommendation,
    Discussion,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::BookRequest, Category::Recommendation, Category::Discussion];

    pub fn label(&self) -> &'static str {
        match self {
            Category::BookRequest => "Book Request",
            Category::Recommendation => "Recommendation",
            Category::Discussion => "Discussion",
        }
    }

    /// Accepts the display label or a compact form like `book-request`.
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "bookrequest" | "request" => Some(Category::BookRequest),
            "recommendation" => Some(Category::Recommendation),
            "discussion" => Some(Category::Discussion),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(only) => *only == category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub title: String,
    pub author: String,
    pub replies: u32,
    pub likes: u32,
    pub category: Category,
    pub time_ago: String,
}

impl Discussion {
    fn new(title: &str, author: &str, replies: u32, likes: u32, category: Category, time_ago: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            replies,
            likes,
            category,
            time_ago: time_ago.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommunityState {
    pub posts: Vec<Discussion>,
    pub selected: CategoryFilter,
}

impl CommunityState {
    pub fn visible(&self) -> Vec<&Discussion> {
        self.posts
            .iter()
            .filter(|post| self.selected.matches(post.category))
            .collect()
    }
}

impl Default for CommunityState {
    fn default() -> Self {
        Self {
            posts: sample_posts(),
            selected: CategoryFilter::All,
        }
    }
}

/// Session-local discussion board; nothing here touches the store.
pub struct CommunityHolder {
    state: Arc<watch::Sender<CommunityState>>,
}

impl CommunityHolder {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CommunityState::default());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn select_category(&self, filter: CategoryFilter) {
        self.state.send_modify(|s| s.selected = filter);
    }

    /// Prepends a post by "You". Blank titles are ignored.
    pub fn add_post(&self, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }

        debug!("new community post: {}", title);
        let post = Discussion::new(title, "You", 0, 0, Category::Discussion, "Just now");
        self.state.send_modify(|s| s.posts.insert(0, post));
        true
    }
}

impl Default for CommunityHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for CommunityHolder {
    type State = CommunityState;

    fn sender(&self) -> &watch::Sender<CommunityState> {
        &self.state
    }
}

fn sample_posts() -> Vec<Discussion> {
    vec![
        Discussion::new(
            "Looking for books similar to 'The Seven Husbands of Evelyn Hugo'",
            "RomanceReader",
            45,
            23,
            Category::BookRequest,
            "1h ago",
        ),
        Discussion::new(
            "Just finished 'Project Hail Mary' - absolutely mind-blowing!",
            "SciFiLover",
            89,
            67,
            Category::Recommendation,
            "3h ago",
        ),
        Discussion::new(
            "Anyone else cry reading 'The Little Prince' as an adult?",
            "NostalgicReader",
            64,
            41,
            Category::Discussion,
            "5h ago",
        ),
    ]
}
