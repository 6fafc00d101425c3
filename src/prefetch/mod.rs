//! Scroll-adaptive speculative media loading.
//!
//! Each scroll event is folded into a velocity/direction estimate that
//! decides how many upcoming items to fetch ahead of the viewport, at what
//! fidelity, and into which cache tier. Issuance and cancellation complete
//! synchronously with the caller; only the fetch itself runs as a spawned
//! task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::domain::FeedItem;
use crate::media::{CacheTier, MediaFetcher, MediaRequest, Resolution};
use crate::monitor::{ContextMonitor, NetworkClass};

/// Items per second above which prefetching yields the network entirely to
/// visible-item loading.
pub const FAST_SCROLL_THRESHOLD: f64 = 10.0;

/// Rows just past the first visible index are likely already on screen, so
/// forward look-ahead starts beyond them.
const VIEWPORT_SKIP: i64 = 2;

/// Look-ahead steps within which a 4G connection still gets full fidelity.
const FULL_RES_STEPS_4G: usize = 1;

/// Look-ahead steps within which fetched bytes may occupy the memory tier.
const MEMORY_TIER_STEPS: usize = 2;

/// An in-flight speculative fetch, cancellable by resource key.
pub struct PrefetchTicket {
    request: MediaRequest,
    abort: AbortHandle,
}

impl PrefetchTicket {
    pub fn request(&self) -> &MediaRequest {
        &self.request
    }

    /// Best-effort cancellation; a no-op once the fetch has finished or was
    /// already cancelled.
    pub fn cancel(&self) {
        self.abort.abort();
    }
}

#[derive(Debug, Clone, Copy)]
struct ScrollSample {
    visible_index: usize,
    at: Instant,
}

pub struct PrefetchScheduler {
    monitor: Arc<dyn ContextMonitor + Send + Sync>,
    fetcher: Arc<dyn MediaFetcher + Send + Sync>,
    tickets: HashMap<String, PrefetchTicket>,
    last_sample: Option<ScrollSample>,
    last_direction: i64,
}

impl PrefetchScheduler {
    pub fn new(
        monitor: Arc<dyn ContextMonitor + Send + Sync>,
        fetcher: Arc<dyn MediaFetcher + Send + Sync>,
    ) -> Self {
        Self {
            monitor,
            fetcher,
            tickets: HashMap::new(),
            last_sample: None,
            last_direction: 1,
        }
    }

    /// Entry point for the presentation layer; one call per scroll event.
    pub fn on_scroll_position_changed(&mut self, items: &[FeedItem], first_visible: usize) {
        self.sample(items, first_visible, Instant::now());
    }

    fn sample(&mut self, items: &[FeedItem], first_visible: usize, now: Instant) {
        self.tickets.retain(|_, ticket| !ticket.abort.is_finished());

        if !self.monitor.prefetch_allowed() {
            self.cancel_all();
            return;
        }

        let (velocity, direction) = match self.last_sample {
            Some(prev) => {
                let delta_index = first_visible as i64 - prev.visible_index as i64;
                let delta_ms = now.duration_since(prev.at).as_millis() as f64;
                let velocity = if delta_ms <= 0.0 {
                    0.0
                } else {
                    delta_index.unsigned_abs() as f64 / delta_ms * 1000.0
                };
                let direction = if delta_index == 0 {
                    self.last_direction
                } else {
                    delta_index.signum()
                };
                (velocity, direction)
            }
            None => (0.0, 1),
        };

        // A fast fling means visible-item loading must not compete with
        // speculative work.
        if velocity > FAST_SCROLL_THRESHOLD {
            debug!(velocity, "fast scroll, dropping speculative loads");
            self.cancel_all();
            self.remember(first_visible, now, direction);
            return;
        }

        // Reversal invalidates every target now behind the viewport.
        if direction != self.last_direction {
            self.cancel_all();
        }
        self.remember(first_visible, now, direction);

        let network = self.monitor.network_class();
        for step in 1..=prefetch_depth(network) {
            let offset = step as i64 * direction + if direction > 0 { VIEWPORT_SKIP } else { 0 };
            let Some(target) = first_visible.checked_add_signed(offset as isize) else {
                continue;
            };
            let Some(item) = items.get(target) else {
                continue;
            };
            if item.media_resource_key().is_empty() {
                continue;
            }
            self.issue(item, step, network);
        }
    }

    fn issue(&mut self, item: &FeedItem, distance: usize, network: NetworkClass) {
        let key = item.media_resource_key().to_string();
        if self.tickets.contains_key(&key) {
            return;
        }

        let resolution = match network {
            NetworkClass::Wifi => Resolution::Full,
            NetworkClass::Cellular4G if distance <= FULL_RES_STEPS_4G => Resolution::Full,
            NetworkClass::Cellular4G | NetworkClass::Cellular3G => Resolution::Reduced,
            NetworkClass::Offline => return,
        };
        let tier = if network == NetworkClass::Cellular3G || distance > MEMORY_TIER_STEPS {
            CacheTier::DiskOnly
        } else {
            CacheTier::MemoryAndDisk
        };

        let request = MediaRequest {
            resource_key: key.clone(),
            resolution,
            tier,
        };
        let fetcher = Arc::clone(&self.fetcher);
        let spawned_request = request.clone();
        let task = tokio::spawn(async move {
            // A failed speculative load just means a later on-demand load
            // starts cold.
            if let Err(e) = fetcher.fetch(spawned_request).await {
                debug!("speculative media fetch failed: {e}");
            }
        });

        self.tickets.insert(
            key,
            PrefetchTicket {
                request,
                abort: task.abort_handle(),
            },
        );
    }

    pub fn cancel_all(&mut self) {
        for ticket in self.tickets.values() {
            ticket.cancel();
        }
        self.tickets.clear();
    }

    pub fn outstanding(&self) -> usize {
        self.tickets.len()
    }

    pub fn ticket(&self, resource_key: &str) -> Option<&PrefetchTicket> {
        self.tickets.get(resource_key)
    }

    fn remember(&mut self, visible_index: usize, at: Instant, direction: i64) {
        self.last_sample = Some(ScrollSample { visible_index, at });
        self.last_direction = direction;
    }
}

fn prefetch_depth(network: NetworkClass) -> usize {
    match network {
        NetworkClass::Wifi => 5,
        NetworkClass::Cellular4G => 3,
        NetworkClass::Cellular3G => 1,
        NetworkClass::Offline => 0,
    }
}
