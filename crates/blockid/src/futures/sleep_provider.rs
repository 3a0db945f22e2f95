use core::{future::Future, time::Duration};

/// A trait that abstracts over how to sleep for a given [`Duration`] in async
/// contexts.
///
/// The async generator uses it to back off between conflicting writes and to
/// enforce timeouts, which keeps it generic over runtimes like `Tokio` or
/// `Smol`.
pub trait SleepProvider {
    /// Returns a future that completes after `dur`. We require `Send` so the
    /// generator's futures can be moved across threads.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}
