//! Persistence layer
//!
//! All durable state lives in a single SQLite key/value table. Values are
//! opaque strings (JSON for structured data) and are always overwritten whole.

pub mod snapshot;
pub mod sqlite;

pub use snapshot::SnapshotStore;

use crate::error::StorageError;

/// Storage key for the preferred quote currency
pub const KEY_CURRENCY: &str = "currency";
/// Storage key for the last successful market snapshot
pub const KEY_SNAPSHOT: &str = "snapshot";
/// Storage key for the persisted alert set
pub const KEY_ALERTS: &str = "alerts";
/// Storage key for the one-time onboarding flag
pub const KEY_ONBOARDING: &str = "has_seen_onboarding";

/// Whole-value key/value storage, last write wins
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value stored under `key`
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
