use std::sync::Arc;

/// Faults a store may report.
///
/// Stores translate their own transport and encoding failures into one of
/// these two categories; the generator does not interpret store-specific
/// codes. A lost compare-and-swap is **not** an error: it is reported as
/// `Ok(false)` from [`OptimisticStore::try_optimistic_write`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Connectivity, missing container/collection, throttling and the like.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The record exists but could not be decoded by the store itself.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

/// The contract a shared counter store must satisfy.
///
/// A store holds exactly one record per scope: the decimal encoding of the
/// exclusive upper bound of all ids ever reserved for that scope. Many
/// generator instances, possibly in different processes, share one store and
/// coordinate solely through [`try_optimistic_write`].
///
/// # Atomicity
///
/// [`try_optimistic_write`] must be a true compare-and-swap for the scope
/// key. A store that performs an unconditional save instead silently breaks
/// id uniqueness; the `expected` parameter is required so such an
/// implementation cannot be written without deliberately ignoring it.
///
/// # Consistency
///
/// [`read`] must observe every write committed before it, whichever instance
/// made it.
///
/// [`read`]: OptimisticStore::read
/// [`try_optimistic_write`]: OptimisticStore::try_optimistic_write
pub trait OptimisticStore: Send + Sync {
    /// Returns the stored counter for `scope`, or `None` if the scope has
    /// never been written.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError>;

    /// Atomically replaces the record for `scope` with `new_value`, but only
    /// if it still equals `expected` (`None` meaning "no record exists").
    ///
    /// Returns `Ok(true)` if the write committed and `Ok(false)` if another
    /// writer changed the record first. A committed value must be visible to
    /// every subsequent [`read`](OptimisticStore::read).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached. Whether the
    /// write committed is then unknown; the generator discards the attempt.
    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError>;
}

impl<S: OptimisticStore + ?Sized> OptimisticStore for &S {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        (**self).read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        (**self).try_optimistic_write(scope, expected, new_value)
    }
}

impl<S: OptimisticStore + ?Sized> OptimisticStore for Arc<S> {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        (**self).read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        (**self).try_optimistic_write(scope, expected, new_value)
    }
}

impl<S: OptimisticStore + ?Sized> OptimisticStore for Box<S> {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        (**self).read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        (**self).try_optimistic_write(scope, expected, new_value)
    }
}
