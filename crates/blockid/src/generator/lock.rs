#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    config::GeneratorConfig,
    error::{Error, Result},
    generator::{GeneratorStats, Reservation, ScopeMap, validate_scope},
    mutex::{Mutex, lock_window},
    store::OptimisticStore,
    window::ScopeWindow,
};

/// A blocking, lock-based id generator suitable for multi-threaded
/// environments.
///
/// Each scope gets its own [`Mutex<ScopeWindow>`], so threads asking for ids
/// in different scopes never contend, and a thread refilling one scope's
/// window blocks only callers of that scope.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Zero store round trips while the local window has ids left
/// - ✅ Safe to run many instances against one shared store
///
/// ## Recommended When
/// - Your store client is synchronous
/// - You're outside an async runtime, or can afford to block a worker thread
///   for one store round trip per batch
///
/// ## See Also
/// - [`AsyncBlockGenerator`]
///
/// [`AsyncBlockGenerator`]: crate::AsyncBlockGenerator
pub struct LockBlockGenerator<S>
where
    S: OptimisticStore,
{
    store: S,
    config: GeneratorConfig,
    scopes: ScopeMap<Mutex<ScopeWindow>>,
    stats: GeneratorStats,
}

impl<S> LockBlockGenerator<S>
where
    S: OptimisticStore,
{
    /// Creates a generator with the default [`GeneratorConfig`] (batches of
    /// 100, unseen scopes starting at 0).
    pub fn new(store: S) -> Self {
        Self::from_parts(store, GeneratorConfig::default())
    }

    /// Creates a generator reserving `batch_size` ids per store round trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `batch_size` is zero.
    pub fn with_batch_size(store: S, batch_size: u64) -> Result<Self> {
        Self::with_config(store, GeneratorConfig::default().with_batch_size(batch_size))
    }

    /// Creates a generator from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the configuration does not
    /// [validate](GeneratorConfig::validate).
    pub fn with_config(store: S, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(store, config))
    }

    fn from_parts(store: S, config: GeneratorConfig) -> Self {
        Self {
            store,
            config,
            scopes: ScopeMap::default(),
            stats: GeneratorStats::default(),
        }
    }

    /// Returns the next id for `scope`.
    ///
    /// Served from the local window when it has capacity; otherwise this
    /// call reserves a fresh batch from the store first, blocking for the
    /// round trips that takes. No id is ever returned twice by any instance
    /// sharing the store, and ids from one instance increase strictly per
    /// scope.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `scope` is empty
    /// - [`Error::StoreUnavailable`] / [`Error::StoreCorrupted`] if the store
    ///   fails or holds an unreadable counter
    /// - [`Error::CounterOverflow`] if the scope's counter is exhausted
    /// - [`Error::Contention`] if every attempt in the retry budget lost
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   scope map lock (std mutexes only)
    ///
    /// A failed call leaves the scope's window untouched. A store call that
    /// panics does not wedge the scope: the next call picks up the same
    /// window.
    ///
    /// # Example
    /// ```
    /// use blockid::{InMemoryStore, LockBlockGenerator};
    ///
    /// let generator = LockBlockGenerator::with_batch_size(InMemoryStore::new(), 3).unwrap();
    /// let ids: Vec<u64> = (0..4).map(|_| generator.try_next_id("invoices").unwrap()).collect();
    /// assert_eq!(ids, [0, 1, 2, 3]);
    /// assert_eq!(generator.store().get("invoices").as_deref(), Some("6"));
    /// ```
    pub fn try_next_id(&self, scope: &str) -> Result<u64> {
        validate_scope(scope)?;
        let guard = self.scopes.get_or_insert(scope)?;
        let mut window = lock_window(&guard);

        let id = match window.take() {
            Some(id) => id,
            None => {
                let (id, fresh) = self.acquire(scope)?.claim();
                *window = fresh;
                id
            }
        };
        self.stats.record_issued();
        Ok(id)
    }

    /// Runs the optimistic batch-acquisition loop for `scope`.
    ///
    /// Must be called with the scope's guard held.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(batch_size = self.config.batch_size))
    )]
    fn acquire(&self, scope: &str) -> Result<Reservation> {
        let retry = &self.config.retry;
        for attempt in 1..=retry.max_attempts {
            self.stats.record_read();
            let observed = self
                .store
                .read(scope)
                .map_err(|e| Error::from_store(scope, e))?;
            let reservation = Reservation::plan(scope, observed, &self.config)?;

            self.stats.record_write();
            let committed = self
                .store
                .try_optimistic_write(scope, reservation.expected(), &reservation.candidate())
                .map_err(|e| Error::from_store(scope, e))?;

            if committed {
                self.stats.record_batch();
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    scope,
                    start = reservation.start(),
                    end = reservation.end(),
                    attempt,
                    "acquired batch"
                );
                return Ok(reservation);
            }

            self.stats.record_conflict();
            #[cfg(feature = "tracing")]
            tracing::trace!(scope, attempt, "conditional write lost, retrying");

            if attempt < retry.max_attempts {
                let delay = retry.backoff(attempt);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(scope, attempts = retry.max_attempts, "retry budget exhausted");
        Err(Error::Contention {
            scope: scope.to_owned(),
            attempts: retry.max_attempts,
        })
    }

    /// Returns a copy of the local window for `scope`, or `None` if this
    /// instance has never served the scope.
    ///
    /// Blocks while another thread is refilling the window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the scope map lock is poisoned (std
    /// mutexes only).
    pub fn window(&self, scope: &str) -> Result<Option<ScopeWindow>> {
        let Some(guard) = self.scopes.get(scope)? else {
            return Ok(None);
        };
        let window = *lock_window(&guard);
        Ok(Some(window))
    }

    /// Names of every scope this instance has served, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the scope map lock is poisoned (std
    /// mutexes only).
    pub fn scopes(&self) -> Result<Vec<String>> {
        self.scopes.names()
    }

    /// The configuration this generator was built with.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Ids reserved per store round trip.
    pub fn batch_size(&self) -> u64 {
        self.config.batch_size
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store-traffic counters for this instance.
    pub fn stats(&self) -> &GeneratorStats {
        &self.stats
    }
}
