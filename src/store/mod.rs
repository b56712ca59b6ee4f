pub mod locks;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{FeedKey, FeedRecord};

pub use locks::KeyLocks;
pub use sqlite::SqliteStore;

pub trait Store {
    // Record operations
    fn get(&self, key: &FeedKey) -> Result<Option<FeedRecord>>;
    fn put(&self, key: &FeedKey, record: &FeedRecord) -> Result<()>;
    fn delete(&self, key: &FeedKey) -> Result<bool>;
    fn list_keys(&self) -> Result<Vec<FeedKey>>;

    // Age policy bookkeeping, kept apart from the record itself
    fn checked_at(&self, key: &FeedKey) -> Result<Option<DateTime<Utc>>>;
    fn mark_checked(&self, key: &FeedKey, at: DateTime<Utc>) -> Result<()>;
}
