//! The grant loop: hands freed slots to queued waiters.
//!
//! One [`GrantLoop`] exists per lock instance. It sleeps on the instance's
//! wake event and, each time it is woken, runs grant passes while slots are
//! free and waiters exist.
//!
//! # Delivery and reentrancy
//!
//! Delivering a grant wakes the waiting caller. Waker code runs on the grant
//! loop's stack and may do anything, including releasing the new lock at
//! once, halting or killing the instance, or dropping the last handle to it.
//! The runner is therefore registered before delivery with no lock held, an
//! inline release simply returns the slot again, and the loop re-checks for
//! teardown right after every delivery.
//!
//! A grant delivered while waker code halts or kills the instance still
//! stands: the caller receives a valid [`Lock`](crate::Lock), and its slot
//! stays counted as running (with `available` one lower) until that lock is
//! released.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use super::Shared;

/// Background future serving queued lock requests.
///
/// Obtained from [`PriorityMultiLock::new`](crate::PriorityMultiLock::new).
/// Spawn it on the executor that runs the lock's callers. It completes when
/// the instance is halted, killed, or dropped by its last owner; it never
/// keeps the instance alive on its own.
#[derive(Debug)]
#[must_use = "queued lock requests are only granted while the grant loop is polled"]
pub struct GrantLoop {
    shared: Weak<Shared>,
    passes: u64,
    grants: u64,
}

/// How a grant pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassOutcome {
    /// Nothing more can be granted until the next wake.
    Idle,
    /// The instance was halted or abandoned; the loop must stop.
    Terminated,
}

impl GrantLoop {
    pub(super) fn new(shared: Weak<Shared>) -> Self {
        Self {
            shared,
            passes: 0,
            grants: 0,
        }
    }

    /// Number of waiters this loop has granted so far.
    #[must_use]
    pub fn grants(&self) -> u64 {
        self.grants
    }

    fn run_pass(&mut self, shared: &Arc<Shared>) -> PassOutcome {
        self.passes += 1;
        loop {
            let (waiter, lock) = {
                let mut state = shared.state.lock();
                if state.halted {
                    return PassOutcome::Terminated;
                }
                if state.available <= 0 || state.waiting == 0 {
                    return PassOutcome::Idle;
                }
                let Some(priority) = state.next_grantable() else {
                    tracing::warn!(
                        available = state.available,
                        waiting = state.waiting,
                        pending_weights = state.total_pending_weights,
                        "no grantable priority despite free slots and waiters"
                    );
                    return PassOutcome::Idle;
                };
                let Some(waiter) = state.priorities[priority].queue.pop_front() else {
                    return PassOutcome::Idle;
                };
                state.waiting -= 1;
                state.retire_if_drained(priority);
                let lock = state.add_runner(shared, priority);
                tracing::trace!(
                    priority,
                    waiter = waiter.id,
                    available = state.available,
                    waiting = state.waiting,
                    "granting queued lock request"
                );
                (waiter, lock)
            };

            self.grants += 1;
            if let Err(undelivered) = waiter.grant.send(lock) {
                // The caller went away between queueing and delivery.
                tracing::debug!("grant recipient gone; releasing its slot");
                drop(undelivered.into_inner());
            }

            if shared.is_halted() || Arc::strong_count(shared) == 1 {
                tracing::debug!("instance torn down during grant delivery");
                return PassOutcome::Terminated;
            }
        }
    }
}

impl Future for GrantLoop {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            let Some(shared) = self.shared.upgrade() else {
                tracing::debug!(grants = self.grants, "grant loop exiting: instance dropped");
                return Poll::Ready(());
            };
            if shared.is_halted() {
                tracing::debug!(grants = self.grants, "grant loop exiting: instance halted");
                return Poll::Ready(());
            }
            if shared.wake.poll_notified(cx).is_pending() {
                return Poll::Pending;
            }
            if self.run_pass(&shared) == PassOutcome::Terminated {
                tracing::debug!(
                    grants = self.grants,
                    passes = self.passes,
                    "grant loop exiting"
                );
                return Poll::Ready(());
            }
        }
    }
}

impl super::State {
    /// Moves the cursor to the next priority that can take a grant.
    ///
    /// Scanning resumes where the previous grant left off and wraps at the
    /// end, so no priority is systematically served first. Returns `None`
    /// only if the scan makes a full round without a match, which the
    /// capacity formula rules out while slots are free and waiters exist.
    fn next_grantable(&mut self) -> Option<usize> {
        for _ in 0..=self.active.len() {
            let priority = self.active.wrap_cursor()?;
            if self.is_grantable(priority) {
                return Some(priority);
            }
            self.active.advance_cursor();
        }
        None
    }
}
