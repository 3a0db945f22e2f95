use core::{future::Future, pin::pin};

use ::futures::future::{Either, select};
pub use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Drives `fut` to completion unless `cancel` fires first.
///
/// An already-cancelled token wins without polling `fut` at all. Dropping
/// `fut` early is how a pending store call is abandoned.
pub(crate) async fn until_cancelled<F>(cancel: Option<&CancellationToken>, fut: F) -> Result<F::Output>
where
    F: Future,
{
    let Some(token) = cancel else {
        return Ok(fut.await);
    };
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let cancelled = pin!(token.cancelled());
    let fut = pin!(fut);
    match select(cancelled, fut).await {
        Either::Left(_) => Err(Error::Cancelled),
        Either::Right((output, _)) => Ok(output),
    }
}
