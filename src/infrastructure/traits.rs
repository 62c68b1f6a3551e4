//! I/O boundary traits for testability
//!
//! These traits abstract persistence of condition rows, allowing services
//! to be tested with in-memory implementations.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::ConditionRow;

/// Error type returned across the store boundary.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence of named searches as MPTT rows.
pub trait SearchStore: Send + Sync {
    /// Replace all rows of `search` with `rows`.
    fn save(&self, search: &str, rows: &[ConditionRow]) -> StoreResult<()>;

    /// Rows of `search` ordered by ascending left label; empty if unknown.
    fn load(&self, search: &str) -> StoreResult<Vec<ConditionRow>>;

    /// Names of all stored searches, sorted.
    fn list(&self) -> StoreResult<Vec<String>>;

    /// Remove `search`. Returns whether it existed.
    fn delete(&self, search: &str) -> StoreResult<bool>;
}

/// Store keeping rows in memory.
#[derive(Debug, Default)]
pub struct InMemorySearchStore {
    searches: Mutex<BTreeMap<String, Vec<ConditionRow>>>,
}

impl InMemorySearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, BTreeMap<String, Vec<ConditionRow>>>> {
        self.searches
            .lock()
            .map_err(|e| format!("search store lock poisoned: {}", e).into())
    }
}

impl SearchStore for InMemorySearchStore {
    fn save(&self, search: &str, rows: &[ConditionRow]) -> StoreResult<()> {
        self.lock()?.insert(search.to_string(), rows.to_vec());
        Ok(())
    }

    fn load(&self, search: &str) -> StoreResult<Vec<ConditionRow>> {
        let mut rows = self.lock()?.get(search).cloned().unwrap_or_default();
        rows.sort_by_key(|row| row.left_label);
        Ok(rows)
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn delete(&self, search: &str) -> StoreResult<bool> {
        Ok(self.lock()?.remove(search).is_some())
    }
}
