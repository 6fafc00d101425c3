use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::app::{FreshetError, Result};
use crate::media::cache::MediaCache;
use crate::media::{MediaFetcher, MediaRequest, Resolution};

/// Width hint sent for reduced-fidelity loads.
pub const REDUCED_WIDTH: u32 = 512;

pub struct HttpMediaFetcher {
    client: Client,
    cache: Arc<MediaCache>,
}

impl HttpMediaFetcher {
    pub fn new(cache: Arc<MediaCache>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("freshet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FreshetError::Transport)?;

        Ok(Self { client, cache })
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }
}

/// Resource URL with the fidelity hint applied.
fn resolution_url(key: &str, resolution: Resolution) -> Result<Url> {
    let mut url = Url::parse(key)?;
    if resolution == Resolution::Reduced {
        url.query_pairs_mut()
            .append_pair("w", &REDUCED_WIDTH.to_string());
    }
    Ok(url)
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, request: MediaRequest) -> Result<()> {
        if self.cache.contains(&request.resource_key, request.resolution) {
            return Ok(());
        }

        let url = resolution_url(&request.resource_key, request.resolution)?;
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

        let bytes = response.bytes().await.map_err(FreshetError::Transport)?;
        self.cache
            .store(&request.resource_key, request.resolution, request.tier, &bytes)
    }
}
