//! # Freshet
//!
//! A client-side incremental feed synchronization and adaptive media
//! prefetch engine.
//!
//! ## Architecture
//!
//! ```text
//! remote api → sync engine → store → presentation
//!                  ↑                      │
//!                poller             scroll events
//!                                         ↓
//!              monitor ────────→ prefetch → media cache
//! ```
//!
//! - [`sync`]: the three-way cursor load protocol (refresh/append/prepend)
//! - [`store`]: SQLite cache of feed items and page boundaries
//! - [`poller`]: periodic new-content discovery with an explicit reveal step
//! - [`prefetch`]: scroll-velocity-adaptive speculative media loading
//! - [`monitor`]: network/power context probes gating prefetch
//!
//! ## Quick start
//!
//! ```bash
//! # Replace the cache with the newest page
//! freshet refresh
//!
//! # Page forward through the cursor chain
//! freshet more
//!
//! # Watch for new content
//! freshet watch --interval 30s
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all
/// components: store, remote API, monitor, media fetcher, engine, poller.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/freshet/config.toml`; a commented default file is
/// created on first run.
pub mod config;

/// Core domain models.
///
/// - [`FeedItem`](domain::FeedItem): a single feed entry
/// - [`PageBoundary`](domain::PageBoundary): the cursors bounding the page
///   an item arrived in
/// - [`CachedFeedState`](domain::CachedFeedState): the cold-start view
pub mod domain;

/// Media fetching and the two-tier media cache.
pub mod media;

/// Network and power context probes.
pub mod monitor;

/// Periodic new-content polling with an explicit reveal step.
pub mod poller;

/// Scroll-adaptive speculative media loading.
pub mod prefetch;

/// Remote feed API client.
///
/// - [`FeedApi`](remote::FeedApi): async trait for page fetching
/// - [`HttpFeedApi`](remote::HttpFeedApi): reqwest-based implementation
pub mod remote;

/// SQLite persistence layer.
///
/// - [`SqliteStore`](store::SqliteStore): items + boundaries tables with
///   scoped write transactions
pub mod store;

/// The cursor-chained load protocol.
///
/// - [`SyncEngine`](sync::SyncEngine): refresh/append/prepend loads,
///   head-merge for revealed content, cache invalidation
pub mod sync;
