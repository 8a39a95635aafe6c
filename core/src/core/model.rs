use serde::{Deserialize, Serialize};

/// One entry of a listed page. `id` is the opaque handle passed back to the
/// delete call; `content` is only kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub author_id: String,
    pub content: String,
}

impl Item {
    pub fn new(id: impl Into<String>, author_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            content: content.into(),
        }
    }
}

/// A normalized page. `next_cursor` is only meaningful when `has_more` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub items: Vec<Item>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Result of a single delete attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeleteOutcome {
    Deleted,
    RateLimited,
    Failed(String),
}

impl std::fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteOutcome::Deleted => write!(f, "Deleted"),
            DeleteOutcome::RateLimited => write!(f, "Rate limited"),
            DeleteOutcome::Failed(reason) => write!(f, "Failed ({})", reason),
        }
    }
}

/// Emitted once per attempted item so callers can observe the run as it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    /// 1-based page index within the run.
    pub page: usize,
    pub item: Item,
    pub outcome: DeleteOutcome,
}
