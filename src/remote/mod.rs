pub mod dto;
pub mod http;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{Cursor, FeedPage};

pub use http::HttpFeedApi;

/// The remote feed source, one page at a time.
#[async_trait]
pub trait FeedApi {
    /// Fetch one page. `cursor: None` asks for the newest page; `owner`
    /// narrows the feed to a single author.
    async fn fetch_page(&self, owner: Option<&str>, cursor: Option<&Cursor>) -> Result<FeedPage>;
}
