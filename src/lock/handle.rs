//! Lock handles and their release notifiers.
//!
//! A granted waiter receives a [`Lock`]. The lock wraps a single-fulfillment
//! release signal shared by every clone of the handle. Fulfilling the signal,
//! by [`Lock::release`] or by dropping the last clone, runs the grant's
//! [`ReleaseNotifier`] exactly once.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Shared;

/// A granted slot in a [`PriorityMultiLock`](crate::PriorityMultiLock).
///
/// Holding a `Lock` counts against the instance's concurrency. The slot is
/// returned when the lock is released explicitly or when the last clone is
/// dropped, whichever comes first. Releasing twice is a no-op.
///
/// Clones observe the same release signal: releasing through any clone
/// releases the slot for all of them.
#[derive(Clone)]
#[must_use = "the slot is released as soon as the lock is dropped"]
pub struct Lock {
    signal: Arc<ReleaseSignal>,
}

struct ReleaseSignal {
    priority: usize,
    notifier: Mutex<Option<ReleaseNotifier>>,
}

impl Lock {
    pub(super) fn new(notifier: ReleaseNotifier) -> Self {
        Self {
            signal: Arc::new(ReleaseSignal {
                priority: notifier.priority,
                notifier: Mutex::new(Some(notifier)),
            }),
        }
    }

    /// Releases the slot. Later calls, on this handle or any clone, do nothing.
    pub fn release(&self) {
        let notifier = self.signal.notifier.lock().take();
        drop(notifier);
    }

    /// Returns true until the slot has been released.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.signal.notifier.lock().is_some()
    }

    /// The priority this slot was granted at.
    #[must_use]
    pub fn priority(&self) -> usize {
        self.signal.priority
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("priority", &self.signal.priority)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Returns one grant's slot to the aggregate when dropped.
///
/// Owned by the release signal of exactly one [`Lock`], so it runs once per
/// grant no matter how the holder lets go: explicit release, drop, panic
/// unwind, or cancellation of the holding task. It keeps the aggregate alive
/// until then.
pub(super) struct ReleaseNotifier {
    shared: Arc<Shared>,
    priority: usize,
}

impl ReleaseNotifier {
    pub(super) fn new(shared: Arc<Shared>, priority: usize) -> Self {
        Self { shared, priority }
    }
}

impl Drop for ReleaseNotifier {
    fn drop(&mut self) {
        self.shared.release_slot(self.priority);
    }
}
