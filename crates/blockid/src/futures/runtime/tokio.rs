use crate::futures::SleepProvider;

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider for use in async applications built on Tokio.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    async fn sleep_for(dur: core::time::Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// Conflict backoff becomes a single trip through the scheduler instead of a
/// timed sleep. This suits stores that resolve conflicts immediately, such as
/// [`InMemoryStore`](crate::InMemoryStore), but spins hot against a remote
/// store under contention. Timeouts still need a real timer: with this
/// provider a timeout elapses on the first scheduler pass, so pair it only
/// with [`AsyncBlockGenerator::try_next_id`] and
/// [`AsyncBlockGenerator::try_next_id_cancellable`].
///
/// [`AsyncBlockGenerator::try_next_id`]: crate::AsyncBlockGenerator::try_next_id
/// [`AsyncBlockGenerator::try_next_id_cancellable`]: crate::AsyncBlockGenerator::try_next_id_cancellable
pub struct TokioYield;
impl SleepProvider for TokioYield {
    async fn sleep_for(_dur: core::time::Duration) {
        tokio::task::yield_now().await;
    }
}
