//! Storage tier traits.
//!
//! - `DurableStore` - the system of record (`SqliteStore`)
//! - `FastMirror` - synchronous text cache used for first reads (`FileMirror`)

use crate::Result;
use serde_json::Value;

/// Trait for the durable tier: one JSON value per string key.
pub trait DurableStore: Send + Sync {
    /// Open the store. Idempotent; fails with `StorageUnavailable` when the
    /// underlying database cannot be opened.
    fn init(&self) -> Result<()>;

    /// Point lookup by key.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key` unless a write with a sequence number
    /// `>= seq` was already applied. Returns whether the write was applied.
    fn set(&self, key: &str, value: &Value, seq: u64) -> Result<bool>;

    /// Sequence number of the last applied write for `key`.
    fn last_seq(&self, key: &str) -> Result<Option<u64>>;

    /// Ask the host to make the store durable. Never fails; returns whether
    /// the upgrade was granted.
    fn request_persistence(&self) -> bool;

    /// Storage location description (for display purposes).
    fn location(&self) -> String;
}

/// Trait for the fast tier: pre-serialized text per key.
pub trait FastMirror: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Replace the text stored under `key` in one atomic step.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Storage location description (for display purposes).
    fn location(&self) -> String;
}
