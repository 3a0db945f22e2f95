use std::{collections::HashMap, sync::Arc};

use crate::{
    error::Result,
    mutex::{Mutex, lock},
};

/// Maps scope names to their guards.
///
/// The outer lock is only held to look up or insert an entry; callers then
/// hold the per-scope guard `W` for as long as they need the window, so
/// requests for unrelated scopes never wait on each other's store round
/// trips. Entries are never removed: a scope lives for the life of the
/// generator.
pub(crate) struct ScopeMap<W> {
    scopes: Mutex<HashMap<String, Arc<W>>>,
}

impl<W> Default for ScopeMap<W> {
    fn default() -> Self {
        Self {
            scopes: Mutex::new(HashMap::new()),
        }
    }
}

impl<W: Default> ScopeMap<W> {
    /// Returns the guard for `scope`, creating it on first use.
    pub(crate) fn get_or_insert(&self, scope: &str) -> Result<Arc<W>> {
        let mut scopes = lock(&self.scopes)?;
        if let Some(guard) = scopes.get(scope) {
            return Ok(Arc::clone(guard));
        }
        let guard = Arc::new(W::default());
        scopes.insert(scope.to_owned(), Arc::clone(&guard));
        Ok(guard)
    }
}

impl<W> ScopeMap<W> {
    /// Returns the guard for `scope` if the scope has been requested before.
    pub(crate) fn get(&self, scope: &str) -> Result<Option<Arc<W>>> {
        Ok(lock(&self.scopes)?.get(scope).cloned())
    }

    /// Names of every scope requested so far, sorted.
    pub(crate) fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = lock(&self.scopes)?.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }
}
