use core::future::Future;
use std::sync::Arc;

use super::StoreError;

/// Async counterpart of [`OptimisticStore`](crate::OptimisticStore).
///
/// The same atomicity and consistency requirements apply. The two futures
/// returned here are the only points at which
/// [`AsyncBlockGenerator`](crate::AsyncBlockGenerator) suspends; they may be
/// dropped before completion when a call is cancelled, in which case a write
/// may or may not have committed.
pub trait AsyncOptimisticStore: Send + Sync {
    /// Returns the stored counter for `scope`, or `None` if the scope has
    /// never been written.
    fn read(&self, scope: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Atomically replaces the record for `scope` with `new_value` if it still
    /// equals `expected` (`None` meaning "no record exists"). Resolves to
    /// `Ok(false)` when another writer got there first.
    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<S: AsyncOptimisticStore + ?Sized> AsyncOptimisticStore for &S {
    fn read(&self, scope: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).try_optimistic_write(scope, expected, new_value)
    }
}

impl<S: AsyncOptimisticStore + ?Sized> AsyncOptimisticStore for Arc<S> {
    fn read(&self, scope: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).try_optimistic_write(scope, expected, new_value)
    }
}
