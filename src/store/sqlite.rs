use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{FreshetError, Result};
use crate::domain::{CachedFeedState, FeedItem, PageBoundary};

/// Which edge of the cached sequence a batch of rows attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Head,
    Tail,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FreshetError::Other(format!("Migration failed: {e}")))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FreshetError::Other(format!("Store lock poisoned: {e}")))
    }

    /// Run `body` inside a single write transaction. An error from the body
    /// rolls everything back; readers never observe a partial batch.
    pub fn transaction<T>(&self, body: impl FnOnce(&FeedTx<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = body(&FeedTx { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    /// The cached feed in remote-return order, with the trailing cursor
    /// taken from the last item's boundary.
    pub fn read_cached_feed(&self) -> Result<CachedFeedState> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, author, media_url, caption, like_count, created_at
             FROM items ORDER BY ord",
        )?;
        let items = stmt
            .query_map([], item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let next_cursor = match items.last() {
            Some(last) => boundary_row(&conn, &last.id)?.and_then(|b| b.next_cursor),
            None => None,
        };

        Ok(CachedFeedState { items, next_cursor })
    }

    pub fn boundary_for(&self, item_id: &str) -> Result<Option<PageBoundary>> {
        let conn = self.lock()?;
        boundary_row(&conn, item_id)
    }

    pub fn cached_ids(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        cached_id_set(&conn)
    }

    pub fn edge_item_id(&self, edge: Placement) -> Result<Option<String>> {
        let conn = self.lock()?;
        let sql = match edge {
            Placement::Head => "SELECT id FROM items ORDER BY ord ASC LIMIT 1",
            Placement::Tail => "SELECT id FROM items ORDER BY ord DESC LIMIT 1",
        };
        Ok(conn.query_row(sql, [], |row| row.get(0)).optional()?)
    }

    pub fn item_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?)
    }
}

/// Handle to an open write transaction. All multi-row mutations go through
/// one of these so a batch commits or rolls back as a unit.
pub struct FeedTx<'a> {
    conn: &'a Connection,
}

impl FeedTx<'_> {
    pub fn upsert_items(&self, items: &[FeedItem], placement: Placement) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let base: i64 = match placement {
            Placement::Tail => self.conn.query_row(
                "SELECT COALESCE(MAX(ord), -1) + 1 FROM items",
                [],
                |row| row.get(0),
            )?,
            Placement::Head => {
                let min: i64 = self.conn.query_row(
                    "SELECT COALESCE(MIN(ord), 0) FROM items",
                    [],
                    |row| row.get(0),
                )?;
                min - items.len() as i64
            }
        };

        for (i, item) in items.iter().enumerate() {
            // Conflicting ids keep the ord they already have.
            self.conn.execute(
                "INSERT INTO items (id, author, media_url, caption, like_count, created_at, ord)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     author = excluded.author,
                     media_url = excluded.media_url,
                     caption = excluded.caption,
                     like_count = excluded.like_count,
                     created_at = excluded.created_at",
                params![
                    item.id,
                    item.author,
                    item.media_url,
                    item.caption,
                    item.like_count,
                    item.created_at.to_rfc3339(),
                    base + i as i64
                ],
            )?;
        }

        Ok(())
    }

    pub fn upsert_boundaries(&self, boundaries: &[PageBoundary]) -> Result<()> {
        for boundary in boundaries {
            self.conn.execute(
                "INSERT INTO boundaries (item_id, prev_cursor, next_cursor) VALUES (?1, ?2, ?3)
                 ON CONFLICT(item_id) DO UPDATE SET
                     prev_cursor = excluded.prev_cursor,
                     next_cursor = excluded.next_cursor",
                params![boundary.item_id, boundary.prev_cursor, boundary.next_cursor],
            )?;
        }
        Ok(())
    }

    pub fn delete_all_items(&self) -> Result<()> {
        self.conn.execute("DELETE FROM items", [])?;
        Ok(())
    }

    pub fn delete_all_boundaries(&self) -> Result<()> {
        self.conn.execute("DELETE FROM boundaries", [])?;
        Ok(())
    }

    pub fn boundary_for(&self, item_id: &str) -> Result<Option<PageBoundary>> {
        boundary_row(self.conn, item_id)
    }

    pub fn cached_ids(&self) -> Result<HashSet<String>> {
        cached_id_set(self.conn)
    }
}

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedItem> {
    Ok(FeedItem {
        id: row.get(0)?,
        author: row.get(1)?,
        media_url: row.get(2)?,
        caption: row.get(3)?,
        like_count: row.get(4)?,
        created_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<DateTime<Utc>>().ok())
}

fn boundary_row(conn: &Connection, item_id: &str) -> Result<Option<PageBoundary>> {
    let result = conn
        .query_row(
            "SELECT item_id, prev_cursor, next_cursor FROM boundaries WHERE item_id = ?1",
            params![item_id],
            |row| {
                Ok(PageBoundary {
                    item_id: row.get(0)?,
                    prev_cursor: row.get(1)?,
                    next_cursor: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(result)
}

fn cached_id_set(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT id FROM items")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(ids)
}
