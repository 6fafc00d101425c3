use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::app::{FreshetError, Result};
use crate::domain::{Cursor, FeedPage};
use crate::remote::dto::FeedPageDto;
use crate::remote::FeedApi;

pub struct HttpFeedApi {
    client: Client,
    base_url: Url,
}

impl HttpFeedApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("freshet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FreshetError::Transport)?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn fetch_page(&self, owner: Option<&str>, cursor: Option<&Cursor>) -> Result<FeedPage> {
        let mut url = self.base_url.join("posts")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(owner) = owner {
                query.append_pair("author", owner);
            }
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FreshetError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FreshetError::Remote(status));
        }

        let page: FeedPageDto = response.json().await.map_err(FreshetError::Transport)?;
        Ok(page.into())
    }
}
