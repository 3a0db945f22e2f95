use core::{pin::pin, time::Duration};

use ::futures::{
    future::{Either, select},
    lock::Mutex as AsyncMutex,
};
#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{CancellationToken, SleepProvider, until_cancelled};
use crate::{
    config::GeneratorConfig,
    error::{Error, Result},
    generator::{GeneratorStats, Reservation, ScopeMap, validate_scope},
    store::AsyncOptimisticStore,
    window::ScopeWindow,
};

/// An async id generator for stores with a non-blocking client.
///
/// Semantically identical to [`LockBlockGenerator`]: same windows, same
/// batch-acquisition protocol, same guarantees. The per-scope guard is an
/// async mutex, so a task refilling a scope's window suspends (instead of
/// blocking a thread) while it waits on the store, and other tasks keep
/// serving unrelated scopes.
///
/// The [`SleepProvider`] type parameter on each call picks the runtime used
/// for conflict backoff and timeouts (e.g. `TokioSleep` or `SmolSleep`).
///
/// # Cancellation
///
/// [`try_next_id_cancellable`] and [`try_next_id_timeout`] abort promptly
/// with [`Error::Cancelled`]. A cancelled call never updates the window. If
/// the abandoned conditional write had already committed, its batch is simply
/// never handed out, which wastes ids but cannot duplicate them.
///
/// [`LockBlockGenerator`]: crate::LockBlockGenerator
/// [`try_next_id_cancellable`]: Self::try_next_id_cancellable
/// [`try_next_id_timeout`]: Self::try_next_id_timeout
pub struct AsyncBlockGenerator<S>
where
    S: AsyncOptimisticStore,
{
    store: S,
    config: GeneratorConfig,
    scopes: ScopeMap<AsyncMutex<ScopeWindow>>,
    stats: GeneratorStats,
}

impl<S> AsyncBlockGenerator<S>
where
    S: AsyncOptimisticStore,
{
    /// Creates a generator with the default [`GeneratorConfig`].
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

    /// Returns the next id for `scope`, acquiring a new batch from the store
    /// if the local window is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`LockBlockGenerator::try_next_id`](crate::LockBlockGenerator::try_next_id).
    pub async fn try_next_id<P>(&self, scope: &str) -> Result<u64>
    where
        P: SleepProvider,
    {
        self.next_id_with::<P>(scope, None).await
    }

    /// Like [`Self::try_next_id`], but gives up with [`Error::Cancelled`] as
    /// soon as `cancel` fires.
    ///
    /// An already-cancelled token fails the call even if the window could
    /// have served it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_next_id`], plus [`Error::Cancelled`].
    pub async fn try_next_id_cancellable<P>(
        &self,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        P: SleepProvider,
    {
        self.next_id_with::<P>(scope, Some(cancel)).await
    }

    /// Like [`Self::try_next_id`], but gives up with [`Error::Cancelled`] if
    /// no id is available within `timeout`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_next_id`], plus [`Error::Cancelled`].
    pub async fn try_next_id_timeout<P>(&self, scope: &str, timeout: Duration) -> Result<u64>
    where
        P: SleepProvider,
    {
        let next = pin!(self.next_id_with::<P>(scope, None));
        let deadline = pin!(P::sleep_for(timeout));
        match select(next, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(scope, ?timeout, "timed out waiting for an id");
                Err(Error::Cancelled)
            }
        }
    }

    async fn next_id_with<P>(&self, scope: &str, cancel: Option<&CancellationToken>) -> Result<u64>
    where
        P: SleepProvider,
    {
        validate_scope(scope)?;
        let guard = self.scopes.get_or_insert(scope)?;
        let mut window = until_cancelled(cancel, guard.lock()).await?;

        let id = match window.take() {
            Some(id) => id,
            None => {
                let (id, fresh) = self.acquire::<P>(scope, cancel).await?.claim();
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
        instrument(level = "debug", skip(self, cancel), fields(batch_size = self.config.batch_size))
    )]
    async fn acquire<P>(&self, scope: &str, cancel: Option<&CancellationToken>) -> Result<Reservation>
    where
        P: SleepProvider,
    {
        let retry = &self.config.retry;
        for attempt in 1..=retry.max_attempts {
            self.stats.record_read();
            let observed = until_cancelled(cancel, self.store.read(scope))
                .await?
                .map_err(|e| Error::from_store(scope, e))?;
            let reservation = Reservation::plan(scope, observed, &self.config)?;
            let candidate = reservation.candidate();

            self.stats.record_write();
            let committed = until_cancelled(
                cancel,
                self.store
                    .try_optimistic_write(scope, reservation.expected(), &candidate),
            )
            .await?
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
                until_cancelled(cancel, P::sleep_for(retry.backoff(attempt))).await?;
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
    /// Waits while another task is refilling the window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the scope map lock is poisoned (std
    /// mutexes only).
    pub async fn window(&self, scope: &str) -> Result<Option<ScopeWindow>> {
        let Some(guard) = self.scopes.get(scope)? else {
            return Ok(None);
        };
        let window = *guard.lock().await;
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
