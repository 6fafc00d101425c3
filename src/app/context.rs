use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{FreshetError, Result};
use crate::config::Config;
use crate::media::{HttpMediaFetcher, MediaCache, MediaFetcher};
use crate::monitor::{ContextMonitor, SystemMonitor};
use crate::poller::NewContentPoller;
use crate::prefetch::PrefetchScheduler;
use crate::remote::{FeedApi, HttpFeedApi};
use crate::store::SqliteStore;
use crate::sync::SyncEngine;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub api: Arc<dyn FeedApi + Send + Sync>,
    pub monitor: Arc<dyn ContextMonitor + Send + Sync>,
    pub media: Arc<dyn MediaFetcher + Send + Sync>,
    pub engine: Arc<SyncEngine>,
    pub poller: Arc<NewContentPoller>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.feed.db_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let timeout = Duration::from_secs(config.api.timeout_secs);
        let api: Arc<dyn FeedApi + Send + Sync> =
            Arc::new(HttpFeedApi::new(&config.api.base_url, timeout)?);
        let monitor: Arc<dyn ContextMonitor + Send + Sync> = Arc::new(SystemMonitor::new());

        let cache_dir = match &config.media.cache_dir {
            Some(p) => p.clone(),
            None => Self::default_media_dir()?,
        };
        let cache = Arc::new(MediaCache::with_memory_capacity(
            cache_dir,
            config.media.memory_entries,
        )?);
        let media: Arc<dyn MediaFetcher + Send + Sync> =
            Arc::new(HttpMediaFetcher::new(cache, timeout)?);

        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            api.clone(),
            config.feed.owner.clone(),
        ));
        let poller = Arc::new(NewContentPoller::new(engine.clone()));

        Ok(Self {
            config,
            store,
            api,
            monitor,
            media,
            engine,
            poller,
        })
    }

    /// Build a scheduler bound to this context's monitor and media fetcher.
    pub fn prefetch_scheduler(&self) -> PrefetchScheduler {
        PrefetchScheduler::new(self.monitor.clone(), self.media.clone())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FreshetError::Config("Could not find data directory".into()))?;
        let dir = data_dir.join("freshet");
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("feed.db"))
    }

    fn default_media_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| FreshetError::Config("Could not find cache directory".into()))?;
        Ok(cache_dir.join("freshet").join("media"))
    }
}
