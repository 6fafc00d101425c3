use serde::{Deserialize, Serialize};

use crate::domain::FeedItem;

/// Opaque pagination token issued by the remote source.
pub type Cursor = String;

/// The cursors bounding the page an item arrived in.
///
/// `None` on either side means the remote reported no further page in that
/// direction when the page was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBoundary {
    pub item_id: String,
    pub prev_cursor: Option<Cursor>,
    pub next_cursor: Option<Cursor>,
}

/// One page of remote results.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<Cursor>,
}

/// Result of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOutcome {
    pub end_of_pagination: bool,
}

/// The durably cached feed, exactly as a cold start reads it.
#[derive(Debug, Clone, Default)]
pub struct CachedFeedState {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<Cursor>,
}

impl CachedFeedState {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
