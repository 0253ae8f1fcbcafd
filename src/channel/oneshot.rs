//! Single-use value channel with waker-based receive.
//!
//! The grant path hands each queued waiter a [`Sender`]; the suspended caller
//! holds the matching [`Receiver`], which is itself a [`Future`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ONESHOT                               │
//! │                                                             │
//! │   Sender                               Receiver             │
//! │     │                                     │                 │
//! │     │─── send(v) ────────────────────────►├── .await ► Ok(v) │
//! │     │                                     │                 │
//! │   (drop) ─────────────────────────────────► .await ► Err    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Wake Discipline
//!
//! The receiver's waker is always invoked after the channel's internal lock is
//! released, so waker code may freely re-enter whatever structure performed the
//! send.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// Error returned when sending fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError<T> {
    /// The receiver was dropped before the value could be sent.
    #[error("sending on a closed oneshot channel")]
    Disconnected(T),
}

impl<T> SendError<T> {
    /// Recovers the value that could not be delivered.
    pub fn into_inner(self) -> T {
        match self {
            Self::Disconnected(value) => value,
        }
    }
}

/// Error returned when receiving fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// The sender was dropped without sending a value.
    #[error("receiving on a closed oneshot channel")]
    Closed,
}

#[derive(Debug)]
struct OneShotInner<T> {
    value: Option<T>,
    sender_dropped: bool,
    receiver_dropped: bool,
    waker: Option<Waker>,
}

impl<T> OneShotInner<T> {
    fn is_closed(&self) -> bool {
        self.sender_dropped && self.value.is_none()
    }
}

/// Creates a new oneshot channel, returning the sender and receiver halves.
#[must_use]
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(Mutex::new(OneShotInner {
        value: None,
        sender_dropped: false,
        receiver_dropped: false,
        waker: None,
    }));
    (
        Sender {
            inner: Arc::clone(&inner),
        },
        Receiver { inner },
    )
}

/// The sending half of a oneshot channel.
///
/// Dropping the sender without sending closes the channel; the receiver then
/// resolves to [`RecvError::Closed`].
#[derive(Debug)]
pub struct Sender<T> {
    inner: Arc<Mutex<OneShotInner<T>>>,
}

impl<T> Sender<T> {
    /// Sends a value, consuming the sender.
    ///
    /// # Errors
    ///
    /// Returns `Err(SendError::Disconnected(value))` if the receiver was dropped.
    pub fn send(self, value: T) -> Result<(), SendError<T>> {
        let waker = {
            let mut inner = self.inner.lock();
            if inner.receiver_dropped {
                return Err(SendError::Disconnected(value));
            }
            inner.value = Some(value);
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        Ok(())
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let waker = {
            let mut inner = self.inner.lock();
            inner.sender_dropped = true;
            if inner.value.is_some() {
                None
            } else {
                inner.waker.take()
            }
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// The receiving half of a oneshot channel.
///
/// Awaiting the receiver yields the sent value, or [`RecvError::Closed`] if
/// the sender went away first. Dropping an unconsumed receiver drops any value
/// already delivered to it.
#[derive(Debug)]
pub struct Receiver<T> {
    inner: Arc<Mutex<OneShotInner<T>>>,
}

impl<T> Receiver<T> {
    /// Returns true if a value is ready to receive.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.lock().value.is_some()
    }

    /// Returns true if the sender has been dropped without sending.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_closed()
    }
}

impl<T> Future for Receiver<T> {
    type Output = Result<T, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.lock();
        if let Some(value) = inner.value.take() {
            return Poll::Ready(Ok(value));
        }
        if inner.is_closed() {
            return Poll::Ready(Err(RecvError::Closed));
        }
        match &mut inner.waker {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            slot => *slot = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        // Take the value out so it is dropped after the lock is released.
        let undelivered = {
            let mut inner = self.inner.lock();
            inner.receiver_dropped = true;
            inner.waker = None;
            inner.value.take()
        };
        drop(undelivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, poll_once, CountingWaker};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn send_then_recv() {
        init_test("send_then_recv");
        let (tx, mut rx) = channel::<i32>();
        tx.send(42).expect("send should succeed");
        let value = poll_once(&mut rx).expect("ready").expect("value");
        crate::assert_with_log!(value == 42, "received value", 42, value);
        crate::test_complete!("send_then_recv");
    }

    #[test]
    fn pending_until_sent_and_wakes_receiver() {
        init_test("pending_until_sent_and_wakes_receiver");
        let (tx, mut rx) = channel::<&'static str>();
        let counter = CountingWaker::new();
        let waker = counter.waker();
        let mut cx = Context::from_waker(&waker);

        let first = Pin::new(&mut rx).poll(&mut cx);
        crate::assert_with_log!(first.is_pending(), "pending before send", true, first.is_pending());

        tx.send("granted").expect("send should succeed");
        crate::assert_with_log!(counter.count() == 1, "woken once", 1, counter.count());

        let second = Pin::new(&mut rx).poll(&mut cx);
        assert!(matches!(second, Poll::Ready(Ok("granted"))));
        crate::test_complete!("pending_until_sent_and_wakes_receiver");
    }

    #[test]
    fn sender_dropped_without_send_closes() {
        init_test("sender_dropped_without_send_closes");
        let (tx, mut rx) = channel::<i32>();
        let counter = CountingWaker::new();
        let waker = counter.waker();
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut rx).poll(&mut cx).is_pending());

        drop(tx);
        crate::assert_with_log!(counter.count() == 1, "woken on close", 1, counter.count());
        assert!(rx.is_closed());
        assert!(matches!(
            Pin::new(&mut rx).poll(&mut cx),
            Poll::Ready(Err(RecvError::Closed))
        ));
        crate::test_complete!("sender_dropped_without_send_closes");
    }

    #[test]
    fn send_to_dropped_receiver_returns_value() {
        init_test("send_to_dropped_receiver_returns_value");
        let (tx, rx) = channel::<i32>();
        drop(rx);
        let value = tx.send(7).expect_err("receiver gone").into_inner();
        crate::assert_with_log!(value == 7, "value returned", 7, value);
        crate::test_complete!("send_to_dropped_receiver_returns_value");
    }

    #[test]
    fn readiness_flags() {
        init_test("readiness_flags");
        let (tx, mut rx) = channel::<i32>();
        assert!(!rx.is_ready());
        assert!(!rx.is_closed());
        tx.send(1).expect("send should succeed");
        assert!(rx.is_ready());
        assert!(!rx.is_closed(), "a delivered value is not a close");
        assert!(matches!(poll_once(&mut rx), Some(Ok(1))));
        assert!(!rx.is_ready());
        crate::test_complete!("readiness_flags");
    }

    #[test]
    fn dropping_receiver_drops_undelivered_value() {
        init_test("dropping_receiver_drops_undelivered_value");
        let marker = Arc::new(());
        let (tx, rx) = channel::<Arc<()>>();
        tx.send(Arc::clone(&marker)).expect("send should succeed");
        crate::assert_with_log!(
            Arc::strong_count(&marker) == 2,
            "value held by channel",
            2,
            Arc::strong_count(&marker)
        );
        drop(rx);
        crate::assert_with_log!(
            Arc::strong_count(&marker) == 1,
            "value dropped with receiver",
            1,
            Arc::strong_count(&marker)
        );
        crate::test_complete!("dropping_receiver_drops_undelivered_value");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SendError::Disconnected(1).to_string(),
            "sending on a closed oneshot channel"
        );
        assert_eq!(
            RecvError::Closed.to_string(),
            "receiving on a closed oneshot channel"
        );
    }
}
