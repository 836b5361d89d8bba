//! In-memory completion store backed by DashMap.
//!
//! Same semantics as the redb store; all data is lost on process exit.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;

use super::{CompletionStore, StoreResult};
use crate::mode::Mode;

#[derive(Debug, Default)]
pub struct MemStore {
    completed: DashMap<Mode, HashSet<String>>,
    mode: RwLock<Mode>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with completions for `mode`.
    pub fn with_completed<I, S>(mode: Mode, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        store
            .completed
            .insert(mode, names.into_iter().map(Into::into).collect());
        store
    }
}

impl CompletionStore for MemStore {
    fn save(&self, mode: Mode, name: &str) -> StoreResult<()> {
        self.completed
            .entry(mode)
            .or_default()
            .insert(name.to_string());
        Ok(())
    }

    fn delete_all(&self, mode: Mode) -> StoreResult<()> {
        self.completed.remove(&mode);
        Ok(())
    }

    fn delete_by_name(&self, mode: Mode, name: &str) -> StoreResult<bool> {
        Ok(self
            .completed
            .get_mut(&mode)
            .is_some_and(|mut set| set.remove(name)))
    }

    fn all(&self, mode: Mode) -> StoreResult<Vec<String>> {
        Ok(self
            .completed
            .get(&mode)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn mode(&self) -> StoreResult<Mode> {
        Ok(*self.mode.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn save_mode(&self, mode: Mode) -> StoreResult<()> {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_delete_round() {
        let store = MemStore::new();
        store.save(Mode::Main, "A").unwrap();
        store.save(Mode::Main, "A").unwrap();
        assert_eq!(store.all(Mode::Main).unwrap(), vec!["A"]);
        assert!(store.delete_by_name(Mode::Main, "A").unwrap());
        assert!(!store.delete_by_name(Mode::Main, "A").unwrap());
        assert!(!store.delete_by_name(Mode::Pbe, "A").unwrap());
    }

    #[test]
    fn completed_set_scoped_by_mode() {
        let store = MemStore::with_completed(Mode::Pbe, ["X", "Y"]);
        assert_eq!(store.completed_set(Mode::Pbe).unwrap().len(), 2);
        assert!(store.completed_set(Mode::Main).unwrap().is_empty());
        store.delete_all(Mode::Pbe).unwrap();
        assert!(store.all(Mode::Pbe).unwrap().is_empty());
    }

    #[test]
    fn mode_round_trip() {
        let store = MemStore::new();
        assert_eq!(store.mode().unwrap(), Mode::Main);
        store.save_mode(Mode::Pbe).unwrap();
        assert_eq!(store.mode().unwrap(), Mode::Pbe);
    }
}
