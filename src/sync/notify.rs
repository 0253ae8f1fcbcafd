//! Wake event with a stored permit.
//!
//! [`Notify`] is fired by many parties and observed by a single listener. It
//! backs the grant loop's "capacity changed" trigger: every release that
//! leaves waiters behind calls [`Notify::notify_one`], and the grant loop
//! polls [`Notify::poll_notified`] between passes.
//!
//! # Stored Permits
//!
//! Every notification leaves a permit that the next poll consumes, whether or
//! not a listener was registered when it fired. Permits coalesce: any number
//! of notifications fired between two polls wake the listener once. The grant
//! loop re-checks all of its conditions on every wake, so coalescing loses
//! nothing.

use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// A wake event for a single listener.
#[derive(Debug, Default)]
pub struct Notify {
    state: Mutex<NotifyState>,
}

#[derive(Debug, Default)]
struct NotifyState {
    /// Set by every notification; cleared by the poll that observes it.
    permit: bool,
    /// The registered listener, if any.
    waker: Option<Waker>,
}

impl Notify {
    /// Creates a new `Notify` with no stored permit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a permit and wakes the listener, if one is registered.
    ///
    /// The permit is consumed by the listener's next poll. The waker is
    /// invoked after the internal lock is released.
    pub fn notify_one(&self) {
        let waker = {
            let mut state = self.state.lock();
            state.permit = true;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Polls for a notification, consuming a stored permit if present.
    ///
    /// Registers `cx`'s waker when no permit is available. Only the most
    /// recently registered waker is kept.
    pub fn poll_notified(&self, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.lock();
        if state.permit {
            state.permit = false;
            state.waker = None;
            return Poll::Ready(());
        }
        match &mut state.waker {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            slot => *slot = Some(cx.waker().clone()),
        }
        Poll::Pending
    }

    #[cfg(test)]
    fn has_stored_permit(&self) -> bool {
        self.state.lock().permit
    }
}
