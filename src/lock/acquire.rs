//! The future returned by [`PriorityMultiLock::lock`](crate::PriorityMultiLock::lock).

use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use super::{Lock, Shared};
use crate::channel::oneshot;
use crate::error::LockError;

/// Future resolving to a granted [`Lock`] or a [`LockError`].
///
/// # Cancel Safety
///
/// Dropping a future that is still queued removes its waiter from the queue,
/// so abandoned requests never receive a slot. If the grant had already been
/// delivered when the future is dropped, the delivered lock is released.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct LockFuture {
    state: AcquireState,
}

#[derive(Debug)]
enum AcquireState {
    /// Decided synchronously by `lock()`.
    Done(Option<Result<Lock, LockError>>),
    /// Queued; resolved by the grant loop or by a kill.
    Queued {
        shared: Weak<Shared>,
        priority: usize,
        id: u64,
        grant: oneshot::Receiver<Lock>,
    },
    /// The queued result was handed out.
    Finished,
}

impl LockFuture {
    pub(super) fn ready(lock: Lock) -> Self {
        Self {
            state: AcquireState::Done(Some(Ok(lock))),
        }
    }

    pub(super) fn failed(error: LockError) -> Self {
        Self {
            state: AcquireState::Done(Some(Err(error))),
        }
    }

    pub(super) fn waiting(
        shared: Weak<Shared>,
        priority: usize,
        id: u64,
        grant: oneshot::Receiver<Lock>,
    ) -> Self {
        Self {
            state: AcquireState::Queued {
                shared,
                priority,
                id,
                grant,
            },
        }
    }

    /// Returns true if polling now would complete without suspending.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match &self.state {
            AcquireState::Done(result) => result.is_some(),
            AcquireState::Queued { grant, .. } => grant.is_ready() || grant.is_closed(),
            AcquireState::Finished => false,
        }
    }

    /// Returns true if the request had to queue.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self.state, AcquireState::Queued { .. })
    }
}

impl Future for LockFuture {
    type Output = Result<Lock, LockError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match &mut self.state {
            AcquireState::Done(result) => {
                let Some(result) = result.take() else {
                    panic!("LockFuture polled after completion");
                };
                return Poll::Ready(result);
            }
            AcquireState::Queued {
                priority, grant, ..
            } => match Pin::new(grant).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(lock)) => {
                    tracing::trace!(priority = *priority, "queued lock request granted");
                    Ok(lock)
                }
                Poll::Ready(Err(oneshot::RecvError::Closed)) => {
                    tracing::debug!(priority = *priority, "queued lock request abandoned by kill");
                    Err(LockError::Killed)
                }
            },
            AcquireState::Finished => panic!("LockFuture polled after completion"),
        };
        self.state = AcquireState::Finished;
        Poll::Ready(outcome)
    }
}

impl Drop for LockFuture {
    fn drop(&mut self) {
        if let AcquireState::Queued {
            shared,
            priority,
            id,
            ..
        } = &self.state
        {
            if let Some(shared) = shared.upgrade() {
                shared.cancel_waiter(*priority, *id);
            }
        }
    }
}
