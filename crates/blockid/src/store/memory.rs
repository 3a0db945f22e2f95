use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{OptimisticStore, StoreError};
use crate::mutex::{Mutex, MutexGuard};

/// A process-local [`OptimisticStore`] backed by a mutex-guarded map.
///
/// Every operation runs under one lock, so the conditional write is trivially
/// atomic. Share a single instance (e.g. behind an [`Arc`]) between several
/// generators to model independent instances coordinating through one store.
///
/// ## Recommended When
/// - Testing code that depends on a generator
/// - All generators live in one process and ids need not survive a restart
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use blockid::{InMemoryStore, LockBlockGenerator};
///
/// let store = Arc::new(InMemoryStore::new());
/// let a = LockBlockGenerator::with_batch_size(Arc::clone(&store), 3).unwrap();
/// let b = LockBlockGenerator::with_batch_size(Arc::clone(&store), 3).unwrap();
///
/// assert_eq!(a.try_next_id("orders").unwrap(), 0);
/// assert_eq!(b.try_next_id("orders").unwrap(), 3);
/// assert_eq!(store.get("orders").as_deref(), Some("6"));
/// ```
///
/// [`Arc`]: std::sync::Arc
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw record for `scope`, bypassing the store contract.
    ///
    /// Returns `None` both for unseen scopes and if the lock is poisoned.
    pub fn get(&self, scope: &str) -> Option<String> {
        self.records().ok()?.get(scope).cloned()
    }

    /// Unconditionally sets the record for `scope`.
    ///
    /// Intended for fixtures only: generators must never write this way.
    pub fn seed(&self, scope: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut records) = self.records() {
            records.insert(scope.into(), value.into());
        }
    }

    /// Number of scopes with a record.
    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns `true` if no scope has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StoreError> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.records.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            self.records
                .lock()
                .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
        }
    }
}

impl OptimisticStore for InMemoryStore {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records()?.get(scope).cloned())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        let mut records = self.records()?;
        if records.get(scope).map(String::as_str) != expected {
            return Ok(false);
        }
        records.insert(scope.to_owned(), new_value.to_owned());
        Ok(true)
    }
}

#[cfg(feature = "futures")]
impl super::AsyncOptimisticStore for InMemoryStore {
    async fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        OptimisticStore::read(self, scope)
    }

    async fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        OptimisticStore::try_optimistic_write(self, scope, expected, new_value)
    }
}
