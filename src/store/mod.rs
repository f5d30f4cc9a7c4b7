//! Embedded persistence for per-user usage records
//!
//! Uses Fjall (an embedded LSM key-value store) with three partitions:
//!
//! - `users`: one JSON [`UserRecord`] per chat user
//! - `logs`: per-link [`ActivityLog`] entries keyed by user and time
//! - `metadata`: bookkeeping such as the last prune time
//!
//! Read-modify-write updates go through a store-wide lock so concurrent
//! batches for the same user never lose an increment.
//!
//! ```rust,ignore
//! use teradrop::store::{FjallUserStore, UserStore};
//!
//! let store = FjallUserStore::open("data/users", 100)?;
//! let (record, created) = store.ensure_user(&profile)?;
//! ```

pub mod error;
pub mod models;
pub mod partitions;
pub mod pruning;
pub mod users;

use std::time::Duration;

pub use error::{Result, StoreError};
pub use models::{ActivityLog, HistoryEntry, LinkOutcome, UserProfile, UserRecord, UserStats};
pub use pruning::PruneStats;
pub use users::FjallUserStore;

/// User record operations used by the pipeline and command handlers
pub trait UserStore: Send + Sync {
    fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>>;

    /// Create the record on first sight, otherwise refresh `last_active`.
    /// The flag is true when the record was just created.
    fn ensure_user(&self, profile: &UserProfile) -> Result<(UserRecord, bool)>;

    fn touch(&self, user_id: i64) -> Result<()>;

    /// Count a delivery, append it to history and refresh `last_active`
    fn record_delivery(&self, user_id: i64, entry: HistoryEntry) -> Result<UserRecord>;

    fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>>;

    fn append_log(&self, entry: &ActivityLog) -> Result<()>;

    /// Newest first
    fn recent_logs(&self, user_id: i64, limit: usize) -> Result<Vec<ActivityLog>>;

    fn prune_logs(&self, ttl: Duration) -> Result<PruneStats>;

    fn persist(&self) -> Result<()>;
}
