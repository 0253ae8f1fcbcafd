//! Weighted fair-share admission lock.
//!
//! A [`PriorityMultiLock`] admits up to `concurrency` simultaneous holders.
//! Callers request a slot at a priority id; ids are plain indexes into the
//! configured weight list and say nothing about importance.
//!
//! # Scheduling
//!
//! Let `weights[n]` be the configured weight of priority `n`, and let the
//! *pending weight* be the sum of weights over priorities that currently have
//! queued waiters. The share of concurrency a waiting priority may occupy is
//!
//! ```text
//! capacity(n) = ceil(weights[n] * concurrency / pending_weight)
//! ```
//!
//! recomputed on every check. Shares are rounded up, so their sum can exceed
//! `concurrency`; the global count of free slots is what prevents actual
//! over-admission.
//!
//! A request is granted on the spot when its priority has no queue, a slot is
//! free, and the priority is below its capacity. Otherwise it queues, and the
//! [`GrantLoop`] hands out slots as they free up, scanning waiting priorities
//! round-robin from a persistent cursor and serving each priority FIFO.
//!
//! # Lifecycle
//!
//! - [`halt`](PriorityMultiLock::halt) stops all future grants. Waiters already
//!   queued are **not** failed; they never resume. New requests that miss the
//!   fast path queue forever as well.
//! - [`kill`](PriorityMultiLock::kill) halts, then fails every queued waiter and
//!   every later request with [`LockError::Killed`].
//! - When the last owner goes away (every `PriorityMultiLock` clone and every
//!   outstanding [`Lock`]), the instance is killed.
//!
//! # Example
//!
//! ```
//! use priority_multilock::PriorityMultiLock;
//! # futures_lite::future::block_on(async {
//! let (pml, grant_loop) = PriorityMultiLock::new(2, &[1, 4]).unwrap();
//! // Spawn `grant_loop` on the executor that runs the callers.
//! # drop(grant_loop);
//!
//! let lock = pml.lock(1).await.unwrap();
//! assert_eq!(pml.runners_count_at(1), 1);
//! lock.release();
//! assert_eq!(pml.runners_count(), 0);
//! # });
//! ```

mod acquire;
mod grant;
mod handle;
mod snapshot;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::oneshot;
use crate::config::PriorityLockConfig;
use crate::error::{ConfigError, LockError};
use crate::sync::Notify;
use crate::util::ActiveList;

pub use acquire::LockFuture;
pub use grant::GrantLoop;
pub use handle::Lock;
use handle::ReleaseNotifier;
pub use snapshot::{LockSnapshot, PrioritySnapshot};

/// Admission lock sharing bounded concurrency across weighted priorities.
///
/// Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct PriorityMultiLock {
    shared: Arc<Shared>,
}

impl PriorityMultiLock {
    /// Creates a lock and the grant loop that serves its queued waiters.
    ///
    /// The returned [`GrantLoop`] must be spawned on the executor running the
    /// callers; without it, requests that miss the fast path are never granted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `concurrency` is zero, `weights` is empty, or
    /// any weight is zero.
    pub fn new(concurrency: usize, weights: &[u32]) -> Result<(Self, GrantLoop), ConfigError> {
        Self::from_config(&PriorityLockConfig::new(concurrency, weights))
    }

    /// Creates a lock from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns any error from [`PriorityLockConfig::validate`].
    pub fn from_config(config: &PriorityLockConfig) -> Result<(Self, GrantLoop), ConfigError> {
        config.validate()?;
        let concurrency = i64::try_from(config.concurrency).unwrap_or(i64::MAX);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                concurrency,
                available: concurrency,
                waiting: 0,
                total_pending_weights: 0,
                killed: false,
                halted: false,
                next_waiter_id: 0,
                priorities: config
                    .weights
                    .iter()
                    .map(|&weight| PriorityClass {
                        weight,
                        runners: 0,
                        queue: VecDeque::new(),
                    })
                    .collect(),
                active: ActiveList::with_slots(config.weights.len()),
            }),
            wake: Notify::new(),
        });
        tracing::debug!(
            concurrency = config.concurrency,
            weights = ?config.weights,
            "priority lock created"
        );
        let grant_loop = GrantLoop::new(Arc::downgrade(&shared));
        Ok((Self { shared }, grant_loop))
    }

    /// Requests a slot at `priority`.
    ///
    /// The decision between an immediate grant, an immediate failure, and
    /// queueing is made synchronously here; the returned future is already
    /// complete in the first two cases.
    ///
    /// # Panics
    ///
    /// Panics if `priority > self.max_priority()`.
    pub fn lock(&self, priority: usize) -> LockFuture {
        self.shared.lock(priority)
    }

    /// Stops handing out slots. Safe to call repeatedly.
    ///
    /// Waiters already queued, and later requests that have to queue, are
    /// neither granted nor failed: they never complete. Use [`kill`](Self::kill)
    /// to fail them instead. Outstanding locks stay valid; as they are released
    /// the free-slot count converges to zero, never above it.
    pub fn halt(&self) {
        self.shared.halt();
    }

    /// Halts, then fails every queued waiter with [`LockError::Killed`].
    ///
    /// Later requests fail immediately with the same error. Safe to call
    /// repeatedly.
    pub fn kill(&self) {
        self.shared.kill();
    }

    /// Returns true once [`halt`](Self::halt) or [`kill`](Self::kill) ran.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.shared.state.lock().halted
    }

    /// Returns true once [`kill`](Self::kill) ran.
    #[must_use]
    pub fn is_killed(&self) -> bool {
        self.shared.state.lock().killed
    }

    /// Highest valid priority id.
    #[must_use]
    pub fn max_priority(&self) -> usize {
        self.shared.state.lock().priorities.len() - 1
    }

    /// Number of slots currently held across all priorities.
    #[must_use]
    pub fn runners_count(&self) -> usize {
        let state = self.shared.state.lock();
        usize::try_from(state.concurrency - state.available).unwrap_or(0)
    }

    /// Number of slots currently held at `priority`.
    ///
    /// # Panics
    ///
    /// Panics if `priority` is out of range.
    #[must_use]
    pub fn runners_count_at(&self, priority: usize) -> usize {
        let state = self.shared.state.lock();
        state.class(priority).runners
    }

    /// Number of queued waiters across all priorities.
    #[must_use]
    pub fn waiters_count(&self) -> usize {
        self.shared.state.lock().waiting
    }

    /// Number of queued waiters at `priority`.
    ///
    /// # Panics
    ///
    /// Panics if `priority` is out of range.
    #[must_use]
    pub fn waiters_count_at(&self, priority: usize) -> usize {
        let state = self.shared.state.lock();
        state.class(priority).queue.len()
    }

    /// Captures the full internal state for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> LockSnapshot {
        self.shared.state.lock().snapshot()
    }
}

impl fmt::Display for PriorityMultiLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.snapshot(), f)
    }
}

impl fmt::Debug for PriorityMultiLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PriorityMultiLock")
            .field(&self.snapshot())
            .finish()
    }
}

/// State shared by handles, release notifiers, pending requests, and the
/// grant loop.
pub(crate) struct Shared {
    state: Mutex<State>,
    /// Fired when a slot frees up while waiters exist.
    wake: Notify,
}

struct State {
    /// Total slots; zero once halted.
    concurrency: i64,
    /// Free slots. Goes negative after a halt while locks are outstanding.
    available: i64,
    /// Queued waiters across all priorities.
    waiting: usize,
    /// Sum of weights over priorities in `active`.
    total_pending_weights: u64,
    killed: bool,
    halted: bool,
    next_waiter_id: u64,
    priorities: Vec<PriorityClass>,
    /// Priorities with at least one queued waiter, plus the grant cursor.
    active: ActiveList,
}

struct PriorityClass {
    weight: u32,
    runners: usize,
    queue: VecDeque<Waiter>,
}

struct Waiter {
    id: u64,
    grant: oneshot::Sender<Lock>,
}

impl State {
    fn class(&self, priority: usize) -> &PriorityClass {
        assert!(
            priority < self.priorities.len(),
            "priority {priority} out of range (max {})",
            self.priorities.len().saturating_sub(1)
        );
        &self.priorities[priority]
    }

    /// Share of concurrency a waiting priority of `weight` may occupy.
    ///
    /// Only meaningful for a priority counted in `total_pending_weights`.
    /// Computed in `u128`, which holds any `u32 * i64` product.
    fn current_capacity(&self, weight: u32) -> usize {
        let concurrency = u128::try_from(self.concurrency).unwrap_or(0);
        if self.total_pending_weights == 0 || concurrency == 0 {
            return 0;
        }
        let capacity = (u128::from(weight) * concurrency)
            .div_ceil(u128::from(self.total_pending_weights));
        usize::try_from(capacity).unwrap_or(usize::MAX)
    }

    fn is_grantable(&self, priority: usize) -> bool {
        let class = &self.priorities[priority];
        !class.queue.is_empty() && class.runners < self.current_capacity(class.weight)
    }

    fn add_runner(&mut self, shared: &Arc<Shared>, priority: usize) -> Lock {
        self.priorities[priority].runners += 1;
        self.available -= 1;
        Lock::new(ReleaseNotifier::new(Arc::clone(shared), priority))
    }

    /// Drops `priority` from the waiting set if its queue just emptied.
    fn retire_if_drained(&mut self, priority: usize) {
        if self.priorities[priority].queue.is_empty() && self.active.contains(priority) {
            self.active.remove(priority);
            self.total_pending_weights -= u64::from(self.priorities[priority].weight);
        }
    }

    /// Returns true on the first call only. Later calls change nothing.
    fn halt(&mut self) -> bool {
        if self.halted {
            return false;
        }
        self.halted = true;
        self.available -= self.concurrency;
        self.concurrency = 0;
        self.active.clear();
        self.total_pending_weights = 0;
        true
    }

    /// Empties every queue, handing the waiters back so their senders can be
    /// dropped outside the lock.
    fn drain_waiters(&mut self) -> Vec<Waiter> {
        self.waiting = 0;
        self.active.clear();
        self.total_pending_weights = 0;
        self.priorities
            .iter_mut()
            .flat_map(|class| class.queue.drain(..))
            .collect()
    }
}

impl Shared {
    fn lock(self: &Arc<Self>, priority: usize) -> LockFuture {
        let mut state = self.state.lock();
        let weight = state.class(priority).weight;
        if state.killed {
            tracing::debug!(priority, "lock request on killed priority lock");
            return LockFuture::failed(LockError::Killed);
        }

        if state.priorities[priority].queue.is_empty() {
            // Count this priority as pending so the capacity check sees the
            // denominator it would have once queued.
            state.total_pending_weights += u64::from(weight);

            if state.available > 0
                && state.priorities[priority].runners < state.current_capacity(weight)
            {
                state.total_pending_weights -= u64::from(weight);
                let lock = state.add_runner(self, priority);
                tracing::debug!(
                    priority,
                    available = state.available,
                    runners = state.priorities[priority].runners,
                    "lock granted without waiting"
                );
                return LockFuture::ready(lock);
            }

            state.active.push_back(priority);
        }

        let id = state.next_waiter_id;
        state.next_waiter_id = state.next_waiter_id.wrapping_add(1);
        let (grant, receiver) = oneshot::channel();
        state.priorities[priority]
            .queue
            .push_back(Waiter { id, grant });
        state.waiting += 1;
        let slots_free = state.available > 0;
        tracing::debug!(
            priority,
            waiter = id,
            waiting = state.waiting,
            pending_weights = state.total_pending_weights,
            "lock request queued"
        );
        drop(state);

        if slots_free {
            self.wake.notify_one();
        }
        LockFuture::waiting(Arc::downgrade(self), priority, id, receiver)
    }

    /// Returns a released slot. Called once per grant by its notifier.
    fn release_slot(&self, priority: usize) {
        let wake = {
            let mut state = self.state.lock();
            state.available += 1;
            let class = &mut state.priorities[priority];
            debug_assert!(class.runners > 0, "release without a runner");
            class.runners = class.runners.saturating_sub(1);
            tracing::trace!(
                priority,
                available = state.available,
                waiting = state.waiting,
                "lock released"
            );
            state.waiting > 0
        };
        if wake {
            self.wake.notify_one();
        }
    }

    /// Removes a still-queued waiter whose caller gave up.
    fn cancel_waiter(&self, priority: usize, id: u64) {
        let (removed, wake) = {
            let mut state = self.state.lock();
            let queue = &mut state.priorities[priority].queue;
            let Some(position) = queue.iter().position(|waiter| waiter.id == id) else {
                return;
            };
            let removed = queue.remove(position);
            state.waiting -= 1;
            state.retire_if_drained(priority);
            tracing::debug!(
                priority,
                waiter = id,
                waiting = state.waiting,
                "queued lock request abandoned"
            );
            (removed, !state.halted && state.available > 0 && state.waiting > 0)
        };
        drop(removed);
        if wake {
            self.wake.notify_one();
        }
    }

    fn halt(&self) {
        let first = self.state.lock().halt();
        if first {
            tracing::info!("priority lock halted");
        }
        self.wake.notify_one();
    }

    fn kill(&self) {
        let abandoned = {
            let mut state = self.state.lock();
            if state.killed {
                return;
            }
            // Set before halting so anything a failed waiter triggers sees it.
            state.killed = true;
            state.halt();
            state.drain_waiters()
        };
        tracing::info!(abandoned = abandoned.len(), "priority lock killed");
        self.wake.notify_one();
        drop(abandoned);
    }

    fn is_halted(&self) -> bool {
        self.state.lock().halted
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.killed {
            state.killed = true;
            state.halt();
            let abandoned = state.drain_waiters();
            tracing::debug!(
                abandoned = abandoned.len(),
                "priority lock dropped by last owner"
            );
            drop(abandoned);
        }
        // A parked grant loop must be polled once more to see the upgrade fail.
        self.wake.notify_one();
    }
}
