//! The cursor-chained load protocol.
//!
//! Three load directions over one logical feed: refresh replaces the cache
//! wholesale, append continues after the last cached item, prepend backfills
//! before the first. The engine owns cursor selection; callers only name the
//! direction. Loads serialize on an internal lock so two read-modify-write
//! passes over the item and boundary tables can never interleave.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::app::Result;
use crate::domain::{CachedFeedState, Cursor, FeedItem, FeedPage, PageBoundary, PageOutcome};
use crate::remote::FeedApi;
use crate::store::{Placement, SqliteStore};

/// Items discovered by polling, not yet part of the visible feed.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<Cursor>,
}

pub struct SyncEngine {
    store: Arc<SqliteStore>,
    api: Arc<dyn FeedApi + Send + Sync>,
    owner: Option<String>,
    load_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<SqliteStore>,
        api: Arc<dyn FeedApi + Send + Sync>,
        owner: Option<String>,
    ) -> Self {
        Self {
            store,
            api,
            owner,
            load_lock: Mutex::new(()),
        }
    }

    /// What a cold start shows before any network call.
    pub fn cold_start(&self) -> Result<CachedFeedState> {
        self.store.read_cached_feed()
    }

    pub fn cached_ids(&self) -> Result<HashSet<String>> {
        self.store.cached_ids()
    }

    /// Replace the entire cache with the newest remote page. Prior items and
    /// boundaries are cleared in the same transaction that writes the new
    /// page, so readers never see two generations mixed.
    pub async fn refresh(&self) -> Result<PageOutcome> {
        let _guard = self.load_lock.lock().await;

        let page = self.api.fetch_page(self.owner.as_deref(), None).await?;
        let outcome = PageOutcome {
            end_of_pagination: page.next_cursor.is_none(),
        };
        let boundaries = page_boundaries(&page, None);

        self.store.transaction(|tx| {
            tx.delete_all_boundaries()?;
            tx.delete_all_items()?;
            tx.upsert_items(&page.items, Placement::Tail)?;
            tx.upsert_boundaries(&boundaries)
        })?;

        debug!(items = page.items.len(), "refresh committed");
        Ok(outcome)
    }

    /// Load the page after the last cached item.
    pub async fn load_more(&self) -> Result<PageOutcome> {
        let _guard = self.load_lock.lock().await;

        let Some(cursor) = self.edge_cursor(Placement::Tail)? else {
            return Ok(PageOutcome {
                end_of_pagination: true,
            });
        };
        self.load_edge(cursor, Placement::Tail).await
    }

    /// Load the page before the first cached item.
    pub async fn load_previous(&self) -> Result<PageOutcome> {
        let _guard = self.load_lock.lock().await;

        let Some(cursor) = self.edge_cursor(Placement::Head)? else {
            return Ok(PageOutcome {
                end_of_pagination: true,
            });
        };
        self.load_edge(cursor, Placement::Head).await
    }

    async fn load_edge(&self, cursor: Cursor, placement: Placement) -> Result<PageOutcome> {
        let page = self
            .api
            .fetch_page(self.owner.as_deref(), Some(&cursor))
            .await?;
        let outcome = PageOutcome {
            end_of_pagination: page.next_cursor.is_none(),
        };
        let boundaries = page_boundaries(&page, Some(cursor));

        self.store.transaction(|tx| {
            tx.upsert_items(&page.items, placement)?;
            tx.upsert_boundaries(&boundaries)
        })?;

        Ok(outcome)
    }

    /// Cursor for the next load in the given direction. `None` means the
    /// chain is exhausted there: no edge item, no boundary row, or a null
    /// cursor. All three are terminal and none is worth a network call.
    fn edge_cursor(&self, edge: Placement) -> Result<Option<Cursor>> {
        let Some(item_id) = self.store.edge_item_id(edge)? else {
            return Ok(None);
        };
        let Some(boundary) = self.store.boundary_for(&item_id)? else {
            return Ok(None);
        };
        Ok(match edge {
            Placement::Tail => boundary.next_cursor,
            Placement::Head => boundary.prev_cursor,
        })
    }

    /// Fetch the newest page without committing anything. Returns `None`
    /// when a load already holds the lock; the poller treats that as a
    /// skipped tick.
    pub async fn peek_newest(&self) -> Result<Option<FeedPage>> {
        let Ok(_guard) = self.load_lock.try_lock() else {
            debug!("load in flight, skipping newest-page peek");
            return Ok(None);
        };

        let page = self.api.fetch_page(self.owner.as_deref(), None).await?;
        Ok(Some(page))
    }

    /// Insert poller-discovered items ahead of the cached feed, skipping ids
    /// that are already visible. Returns how many items were inserted.
    pub async fn merge_at_head(&self, batch: PendingBatch) -> Result<usize> {
        let _guard = self.load_lock.lock().await;

        let cached = self.store.cached_ids()?;
        let fresh: Vec<FeedItem> = batch
            .items
            .into_iter()
            .filter(|item| !cached.contains(&item.id))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let boundaries: Vec<PageBoundary> = fresh
            .iter()
            .map(|item| PageBoundary {
                item_id: item.id.clone(),
                prev_cursor: None,
                next_cursor: batch.next_cursor.clone(),
            })
            .collect();

        let inserted = fresh.len();
        self.store.transaction(|tx| {
            tx.upsert_items(&fresh, Placement::Head)?;
            tx.upsert_boundaries(&boundaries)
        })?;

        debug!(inserted, "merged pending items at head");
        Ok(inserted)
    }

    /// Drop every cached item and boundary, e.g. on logout.
    pub async fn invalidate(&self) -> Result<()> {
        let _guard = self.load_lock.lock().await;
        self.store.transaction(|tx| {
            tx.delete_all_boundaries()?;
            tx.delete_all_items()
        })
    }
}

fn page_boundaries(page: &FeedPage, cursor_used: Option<Cursor>) -> Vec<PageBoundary> {
    page.items
        .iter()
        .map(|item| PageBoundary {
            item_id: item.id.clone(),
            prev_cursor: cursor_used.clone(),
            next_cursor: page.next_cursor.clone(),
        })
        .collect()
}
