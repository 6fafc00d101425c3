use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single feed entry as the remote source describes it.
///
/// Immutable once fetched, except `like_count`, which user-action paths may
/// rewrite; the sync engine only ever replaces whole rows. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub author: String,
    pub media_url: String,
    pub caption: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            media_url: media_url.into(),
            caption: String::new(),
            like_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Key under which this item's media is fetched and cached.
    pub fn media_resource_key(&self) -> &str {
        &self.media_url
    }
}
