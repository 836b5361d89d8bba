//! ACID-durable completion store backed by redb.
//!
//! One table per mode maps a completed deck name to the unix time it was first
//! completed; a small settings table holds the active mode.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableTable, TableDefinition};

use super::{CompletionStore, StoreResult};
use crate::error::StoreError;
use crate::mode::Mode;

const COMPLETED_MAIN: TableDefinition<&str, u64> = TableDefinition::new("completed_main");
const COMPLETED_PBE: TableDefinition<&str, u64> = TableDefinition::new("completed_pbe");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

const MODE_KEY: &str = "mode";

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "deck-scout.redb";

fn completed_table(mode: Mode) -> TableDefinition<'static, &'static str, u64> {
    match mode {
        Mode::Main => COMPLETED_MAIN,
        Mode::Pbe => COMPLETED_PBE,
    }
}

fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Persistent completion store.
///
/// All writes go through transactions. Reads use MVCC snapshots.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        Self::open_file(&data_dir.join(DATABASE_FILE))
    }

    /// Open or create the store at an explicit database path.
    pub fn open_file(db_path: &Path) -> StoreResult<Self> {
        let db = Database::create(db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;

        // Create every table up front so read transactions never miss one.
        let txn = db.begin_write().map_err(redb_err("begin_write"))?;
        {
            txn.open_table(COMPLETED_MAIN).map_err(redb_err("open_table"))?;
            txn.open_table(COMPLETED_PBE).map_err(redb_err("open_table"))?;
            txn.open_table(SETTINGS).map_err(redb_err("open_table"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;

        tracing::debug!(path = %db_path.display(), "completion store opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// When `name` was first marked completed, as unix seconds.
    pub fn completed_at(&self, mode: Mode, name: &str) -> StoreResult<Option<u64>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(completed_table(mode))
            .map_err(redb_err("open_table"))?;
        let value = table.get(name).map_err(redb_err("get"))?;
        Ok(value.map(|guard| guard.value()))
    }
}

impl CompletionStore for RedbStore {
    fn save(&self, mode: Mode, name: &str) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut table = txn
                .open_table(completed_table(mode))
                .map_err(redb_err("open_table"))?;
            let exists = table.get(name).map_err(redb_err("get"))?.is_some();
            if !exists {
                table.insert(name, unix_now()).map_err(redb_err("insert"))?;
            }
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }

    fn delete_all(&self, mode: Mode) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut table = txn
                .open_table(completed_table(mode))
                .map_err(redb_err("open_table"))?;
            let mut names = Vec::new();
            for item in table.iter().map_err(redb_err("iter"))? {
                let (key, _) = item.map_err(redb_err("iter"))?;
                names.push(key.value().to_string());
            }
            for name in &names {
                table.remove(name.as_str()).map_err(redb_err("remove"))?;
            }
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }

    fn delete_by_name(&self, mode: Mode, name: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let existed = {
            let mut table = txn
                .open_table(completed_table(mode))
                .map_err(redb_err("open_table"))?;
            let removed = table.remove(name).map_err(redb_err("remove"))?;
            removed.is_some()
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(existed)
    }

    fn all(&self, mode: Mode) -> StoreResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(completed_table(mode))
            .map_err(redb_err("open_table"))?;
        let mut names = Vec::new();
        for item in table.iter().map_err(redb_err("iter"))? {
            let (key, _) = item.map_err(redb_err("iter"))?;
            names.push(key.value().to_string());
        }
        Ok(names)
    }

    fn mode(&self) -> StoreResult<Mode> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(SETTINGS).map_err(redb_err("open_table"))?;
        let Some(guard) = table.get(MODE_KEY).map_err(redb_err("get"))? else {
            return Ok(Mode::default());
        };
        let raw = guard.value();
        raw.parse().map_err(|_| StoreError::CorruptSetting {
            key: MODE_KEY.to_string(),
            value: raw.to_string(),
        })
    }

    fn save_mode(&self, mode: Mode) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut table = txn.open_table(SETTINGS).map_err(redb_err("open_table"))?;
            table
                .insert(MODE_KEY, mode.as_str())
                .map_err(redb_err("insert"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[test]
    fn save_all_delete() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path()).unwrap();

        store.save(Mode::Main, "A").unwrap();
        store.save(Mode::Main, "B").unwrap();
        assert_eq!(sorted(store.all(Mode::Main).unwrap()), vec!["A", "B"]);

        assert!(store.delete_by_name(Mode::Main, "A").unwrap());
        assert!(!store.delete_by_name(Mode::Main, "A").unwrap());
        assert_eq!(store.all(Mode::Main).unwrap(), vec!["B"]);
    }

    #[test]
    fn save_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path()).unwrap();

        store.save(Mode::Pbe, "X").unwrap();
        let first = store.completed_at(Mode::Pbe, "X").unwrap();
        store.save(Mode::Pbe, "X").unwrap();
        assert_eq!(store.all(Mode::Pbe).unwrap(), vec!["X"]);
        assert_eq!(store.completed_at(Mode::Pbe, "X").unwrap(), first);
    }

    #[test]
    fn modes_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path()).unwrap();

        store.save(Mode::Main, "Shared").unwrap();
        assert!(store.all(Mode::Pbe).unwrap().is_empty());

        store.save(Mode::Pbe, "Beta").unwrap();
        store.delete_all(Mode::Main).unwrap();
        assert!(store.all(Mode::Main).unwrap().is_empty());
        assert_eq!(store.all(Mode::Pbe).unwrap(), vec!["Beta"]);
    }

    #[test]
    fn mode_defaults_to_main_and_persists() {
        let dir = TempDir::new().unwrap();
        {
            let store = RedbStore::open(dir.path()).unwrap();
            assert_eq!(store.mode().unwrap(), Mode::Main);
            store.save_mode(Mode::Pbe).unwrap();
        }
        let store = RedbStore::open(dir.path()).unwrap();
        assert_eq!(store.mode().unwrap(), Mode::Pbe);
    }

    #[test]
    fn delete_all_on_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path()).unwrap();
        store.delete_all(Mode::Pbe).unwrap();
        assert!(store.all(Mode::Pbe).unwrap().is_empty());
    }
}
