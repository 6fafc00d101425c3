pub mod cache;
pub mod http;

use async_trait::async_trait;

use crate::app::Result;

pub use cache::MediaCache;
pub use http::HttpMediaFetcher;

/// Fidelity of a media load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Full,
    Reduced,
}

/// Which cache tiers a fetched body may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    MemoryAndDisk,
    DiskOnly,
}

/// One speculative (or on-demand) media load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub resource_key: String,
    pub resolution: Resolution,
    pub tier: CacheTier,
}

#[async_trait]
pub trait MediaFetcher {
    async fn fetch(&self, request: MediaRequest) -> Result<()>;
}
