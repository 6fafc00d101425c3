//! Periodic discovery of new feed content.
//!
//! A fixed-interval task peeks at the newest remote page and buffers items
//! the cache has not seen, without touching the visible feed. The buffer is
//! only folded in when the caller explicitly reveals it. Polling is
//! best-effort: failures are logged and swallowed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::app::{FreshetError, Result};
use crate::domain::{Cursor, FeedItem};
use crate::sync::{PendingBatch, SyncEngine};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

struct PendingEntry {
    item: FeedItem,
    next_cursor: Option<Cursor>,
}

pub struct NewContentPoller {
    engine: Arc<SyncEngine>,
    pending: Mutex<Vec<PendingEntry>>,
    has_new: watch::Sender<bool>,
}

impl NewContentPoller {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let (has_new, _) = watch::channel(false);
        Self {
            engine,
            pending: Mutex::new(Vec::new()),
            has_new,
        }
    }

    /// Signal that holds `true` while undisclosed items are buffered.
    pub fn has_new_content(&self) -> watch::Receiver<bool> {
        self.has_new.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// One poll pass. Skips silently when a sync load is in flight; buffers
    /// fetched items that neither the cache nor the buffer has seen.
    pub async fn tick(&self) -> Result<()> {
        let Some(page) = self.engine.peek_newest().await? else {
            return Ok(());
        };
        let cached = self.engine.cached_ids()?;
        let next_cursor = page.next_cursor.clone();

        let mut pending = self.lock_pending()?;
        let buffered: HashSet<&str> = pending.iter().map(|e| e.item.id.as_str()).collect();
        let fresh: Vec<FeedItem> = page
            .items
            .into_iter()
            .filter(|item| !cached.contains(&item.id) && !buffered.contains(item.id.as_str()))
            .collect();
        drop(buffered);

        if fresh.is_empty() {
            return Ok(());
        }

        debug!(count = fresh.len(), "buffered newly discovered items");
        let entries: Vec<PendingEntry> = fresh
            .into_iter()
            .map(|item| PendingEntry {
                item,
                next_cursor: next_cursor.clone(),
            })
            .collect();
        pending.splice(0..0, entries);
        self.has_new.send_replace(true);
        Ok(())
    }

    /// Fold the entire pending buffer into the front of the visible feed.
    /// The buffer is only cleared once the merge commits, so a failed merge
    /// loses nothing.
    pub async fn reveal(&self) -> Result<usize> {
        let batch = {
            let pending = self.lock_pending()?;
            if pending.is_empty() {
                self.has_new.send_replace(false);
                return Ok(0);
            }
            PendingBatch {
                items: pending.iter().map(|e| e.item.clone()).collect(),
                next_cursor: pending.first().and_then(|e| e.next_cursor.clone()),
            }
        };

        let inserted = self.engine.merge_at_head(batch).await?;
        self.lock_pending()?.clear();
        self.has_new.send_replace(false);
        Ok(inserted)
    }

    /// Run `tick` on a fixed cadence until the handle stops the task.
    pub fn spawn(self: Arc<Self>, every: Duration) -> PollerHandle {
        let task = tokio::spawn(async move {
            let mut timer = interval(every);
            timer.tick().await; // the first tick completes immediately
            loop {
                timer.tick().await;
                if let Err(e) = self.tick().await {
                    warn!("new-content poll failed: {e}");
                }
            }
        });
        PollerHandle { task }
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, Vec<PendingEntry>>> {
        self.pending
            .lock()
            .map_err(|e| FreshetError::Other(format!("Pending buffer lock poisoned: {e}")))
    }
}

/// Owns the spawned polling task; dropping it stops the loop.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Parse an interval like "30s", "5m", "1h", "1d", or raw seconds.
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .map(|h| h * 3600)
            .map_err(|_| format!("Invalid hours: {hours}"))
    } else if let Some(minutes) = s.strip_suffix('m') {
        minutes
            .parse::<u64>()
            .map(|m| m * 60)
            .map_err(|_| format!("Invalid minutes: {minutes}"))
    } else if let Some(days) = s.strip_suffix('d') {
        days.parse::<u64>()
            .map(|d| d * 86400)
            .map_err(|_| format!("Invalid days: {days}"))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>()
            .map_err(|_| format!("Invalid seconds: {secs}"))
    } else {
        s.parse::<u64>()
            .map_err(|_| format!("Invalid interval: {s}. Use format like '30s', '5m', '1h'"))
    }
}

/// Format a second count the way `parse_interval` accepts it.
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use crate::domain::FeedPage;
    use crate::remote::FeedApi;
    use crate::store::SqliteStore;

    struct MockApi {
        pages: StdMutex<HashMap<Option<Cursor>, FeedPage>>,
        calls: AtomicUsize,
        fail: AtomicBool,
        block: AtomicBool,
        gate: Semaphore,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                pages: StdMutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                block: AtomicBool::new(false),
                gate: Semaphore::new(0),
            }
        }

        fn set_page(&self, cursor: Option<&str>, items: &[&str], next: Option<&str>) {
            let page = FeedPage {
                items: items.iter().map(|id| item(id)).collect(),
                next_cursor: next.map(String::from),
            };
            self.pages
                .lock()
                .unwrap()
                .insert(cursor.map(String::from), page);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedApi for MockApi {
        async fn fetch_page(
            &self,
            _owner: Option<&str>,
            cursor: Option<&Cursor>,
        ) -> Result<FeedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.block.load(Ordering::SeqCst) {
                let _permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|_| FreshetError::Other("gate closed".into()))?;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FreshetError::Remote(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            self.pages
                .lock()
                .unwrap()
                .get(&cursor.cloned())
                .cloned()
                .ok_or_else(|| FreshetError::Other(format!("no page for cursor {cursor:?}")))
        }
    }

    fn item(id: &str) -> FeedItem {
        FeedItem::new(id, "ada", format!("https://cdn.example.com/{id}.jpg"))
    }

    fn engine_with(api: Arc<MockApi>) -> Arc<SyncEngine> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        Arc::new(SyncEngine::new(store, api, None))
    }

    fn visible_ids(engine: &SyncEngine) -> Vec<String> {
        engine
            .cold_start()
            .unwrap()
            .items
            .into_iter()
            .map(|i| i.id)
            .collect()
    }

    #[tokio::test]
    async fn test_tick_buffers_without_touching_visible_feed() {
        let api = Arc::new(MockApi::new());
        api.set_page(None, &["p1", "p2"], Some("c1"));

        let engine = engine_with(api.clone());
        let poller = NewContentPoller::new(engine.clone());
        engine.refresh().await.unwrap();

        api.set_page(None, &["n1", "p1", "p2"], Some("c1"));
        poller.tick().await.unwrap();

        assert_eq!(poller.pending_count(), 1);
        assert!(*poller.has_new_content().borrow());
        assert_eq!(visible_ids(&engine), ["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_reveal_prepends_pending_and_clears_signal() {
        let api = Arc::new(MockApi::new());
        api.set_page(None, &["p1", "p2"], Some("c1"));

        let engine = engine_with(api.clone());
        let poller = NewContentPoller::new(engine.clone());
        engine.refresh().await.unwrap();

        api.set_page(None, &["n1", "n2", "p1"], Some("c1"));
        poller.tick().await.unwrap();
        assert_eq!(poller.pending_count(), 2);

        let inserted = poller.reveal().await.unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(visible_ids(&engine), ["n1", "n2", "p1", "p2"]);
        assert_eq!(poller.pending_count(), 0);
        assert!(!*poller.has_new_content().borrow());

        // Nothing left to reveal.
        assert_eq!(poller.reveal().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_most_recent_tick_items_come_first() {
        let api = Arc::new(MockApi::new());
        api.set_page(None, &["p1"], None);

        let engine = engine_with(api.clone());
        let poller = NewContentPoller::new(engine.clone());
        engine.refresh().await.unwrap();

        api.set_page(None, &["n3", "p1"], None);
        poller.tick().await.unwrap();

        api.set_page(None, &["n1", "n2", "n3", "p1"], None);
        poller.tick().await.unwrap();

        assert_eq!(poller.pending_count(), 3);
        poller.reveal().await.unwrap();
        assert_eq!(visible_ids(&engine), ["n1", "n2", "n3", "p1"]);
    }

    #[tokio::test]
    async fn test_tick_with_nothing_new_raises_no_signal() {
        let api = Arc::new(MockApi::new());
        api.set_page(None, &["p1", "p2"], None);

        let engine = engine_with(api.clone());
        let poller = NewContentPoller::new(engine.clone());
        engine.refresh().await.unwrap();

        poller.tick().await.unwrap();
        assert_eq!(poller.pending_count(), 0);
        assert!(!*poller.has_new_content().borrow());
    }

    #[tokio::test]
    async fn test_tick_skips_while_load_in_flight() {
        let api = Arc::new(MockApi::new());
        api.set_page(None, &["p1"], None);
        api.block.store(true, Ordering::SeqCst);

        let engine = engine_with(api.clone());
        let poller = NewContentPoller::new(engine.clone());

        let refresh = tokio::spawn({
            let engine = engine.clone();
            async move { engine.refresh().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(api.calls(), 1);

        // The in-flight refresh holds the load lock, so the tick is a no-op.
        poller.tick().await.unwrap();
        assert_eq!(api.calls(), 1);
        assert_eq!(poller.pending_count(), 0);

        api.block.store(false, Ordering::SeqCst);
        api.gate.add_permits(1);
        refresh.await.unwrap().unwrap();
        assert_eq!(visible_ids(&engine), ["p1"]);
    }

    #[tokio::test]
    async fn test_poll_failure_buffers_nothing() {
        let api = Arc::new(MockApi::new());
        api.set_page(None, &["p1"], None);

        let engine = engine_with(api.clone());
        let poller = NewContentPoller::new(engine.clone());
        engine.refresh().await.unwrap();

        api.fail.store(true, Ordering::SeqCst);
        assert!(poller.tick().await.is_err());
        assert_eq!(poller.pending_count(), 0);
        assert!(!*poller.has_new_content().borrow());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30s").unwrap(), 30);
        assert_eq!(parse_interval("5m").unwrap(), 300);
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval("45").unwrap(), 45);
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(30), "30s");
        assert_eq!(format_interval(300), "5m");
        assert_eq!(format_interval(3600), "1h");
        assert_eq!(format_interval(86400), "1d");
        assert_eq!(format_interval(90), "90s");
    }
}
