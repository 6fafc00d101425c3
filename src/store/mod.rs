pub mod sqlite;

pub use sqlite::{FeedTx, Placement, SqliteStore};
