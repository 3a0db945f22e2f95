use crate::{codec::CodecError, store::StoreError};

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `blockid` can emit.
///
/// Every failed call to a generator yields exactly one of these. None of them
/// require compensating action: at worst an abandoned batch wastes a range of
/// ids that is never handed out again.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A caller-supplied value was rejected before touching the store, e.g. an
    /// empty scope name or a zero batch size.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },

    /// The backing store could not be reached or refused the request.
    ///
    /// Never retried by the generator; callers may retry the whole call.
    #[error("store unavailable for scope `{scope}`: {reason}")]
    StoreUnavailable {
        /// The scope being served when the fault occurred.
        scope: String,
        /// Store-provided description of the fault.
        reason: String,
    },

    /// The stored counter for a scope is not a valid decimal `u64`.
    #[error("store corrupted for scope `{scope}`: {reason}")]
    StoreCorrupted {
        /// The scope whose record is unreadable.
        scope: String,
        /// Why the record was rejected.
        reason: String,
    },

    /// Every conditional write in the retry budget lost to another writer.
    #[error("gave up on scope `{scope}` after {attempts} conflicting writes")]
    Contention {
        /// The contended scope.
        scope: String,
        /// Number of conditional writes attempted.
        attempts: u32,
    },

    /// Reserving another batch would push the counter past `u64::MAX`.
    #[error("counter for scope `{scope}` would overflow: {current} + {batch_size}")]
    CounterOverflow {
        /// The exhausted scope.
        scope: String,
        /// Counter value read from the store.
        current: u64,
        /// Batch size that could not be added.
        batch_size: u64,
    },

    /// The call was cancelled or timed out before a batch was acquired.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation failed because a lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn from_store(scope: &str, err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => Self::StoreUnavailable {
                scope: scope.to_owned(),
                reason,
            },
            StoreError::Corrupted(reason) => Self::StoreCorrupted {
                scope: scope.to_owned(),
                reason,
            },
        }
    }

    pub(crate) fn from_codec(scope: &str, err: CodecError) -> Self {
        Self::StoreCorrupted {
            scope: scope.to_owned(),
            reason: err.to_string(),
        }
    }

    /// Returns `true` if retrying the same call later may succeed.
    ///
    /// Store outages, contention and cancellation are transient; invalid
    /// input, corrupted counters and overflow are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::Contention { .. } | Self::Cancelled
        )
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};

// Convert all poisoned lock errors to a simplified `LockPoisoned`
#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
