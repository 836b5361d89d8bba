//! Completion storage.
//!
//! Two backends implement [`CompletionStore`]:
//!
//! - [`RedbStore`]: persistent, ACID transactions (redb)
//! - [`MemStore`]: in-memory sets in a concurrent hashmap (DashMap)
//!
//! The recommendation core only reads through this trait and asks it for
//! mutations; it never persists anything itself.

pub mod durable;
pub mod mem;

use std::collections::HashSet;

use crate::error::StoreError;
use crate::mode::Mode;

pub use durable::RedbStore;
pub use mem::MemStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Records completed deck names per mode, and the active mode.
pub trait CompletionStore: Send + Sync {
    /// Mark `name` completed. Saving an already completed name is a no-op.
    fn save(&self, mode: Mode, name: &str) -> StoreResult<()>;

    /// Forget every completion for `mode`.
    fn delete_all(&self, mode: Mode) -> StoreResult<()>;

    /// Forget one completion. Returns whether it existed.
    fn delete_by_name(&self, mode: Mode, name: &str) -> StoreResult<bool>;

    /// All completed names for `mode`, in no particular order.
    fn all(&self, mode: Mode) -> StoreResult<Vec<String>>;

    /// The persisted active mode (`Main` when nothing was saved yet).
    fn mode(&self) -> StoreResult<Mode>;

    fn save_mode(&self, mode: Mode) -> StoreResult<()>;

    /// Completed names as a set, for membership checks.
    fn completed_set(&self, mode: Mode) -> StoreResult<HashSet<String>> {
        Ok(self.all(mode)?.into_iter().collect())
    }
}
