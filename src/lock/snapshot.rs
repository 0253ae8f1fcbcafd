//! Point-in-time diagnostics for a lock instance.

use std::fmt;

use serde::Serialize;

use super::State;

/// Full internal state of a [`PriorityMultiLock`](crate::PriorityMultiLock).
///
/// Intended for logs, debugging, and tests. `Display` renders the compact
/// one-line form; serde renders structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockSnapshot {
    /// Total slots; zero once halted.
    pub concurrency: i64,
    /// Free slots; negative after a halt while locks are outstanding.
    pub available: i64,
    /// Slots held (`concurrency - available`).
    pub running: i64,
    /// Queued waiters.
    pub waiting: usize,
    /// Sum of weights over priorities with queued waiters.
    pub pending_weights: u64,
    /// Whether the instance was halted.
    pub halted: bool,
    /// Whether the instance was killed.
    pub killed: bool,
    /// Per-priority detail, indexed by priority id.
    pub priorities: Vec<PrioritySnapshot>,
}

/// Per-priority part of a [`LockSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrioritySnapshot {
    /// Priority id.
    pub priority: usize,
    /// Configured weight.
    pub weight: u32,
    /// Slots held at this priority.
    pub runners: usize,
    /// Queued waiters at this priority.
    pub waiters: usize,
    /// Current capacity; zero when nothing is queued.
    pub capacity: usize,
    /// Whether the priority is in the waiting set the grant loop scans.
    pub active: bool,
}

impl LockSnapshot {
    /// Sum of runners over all priorities.
    #[must_use]
    pub fn total_runners(&self) -> usize {
        self.priorities.iter().map(|p| p.runners).sum()
    }

    /// Sum of queued waiters over all priorities.
    #[must_use]
    pub fn total_waiters(&self) -> usize {
        self.priorities.iter().map(|p| p.waiters).sum()
    }
}

impl State {
    pub(super) fn snapshot(&self) -> LockSnapshot {
        let priorities = self
            .priorities
            .iter()
            .enumerate()
            .map(|(priority, class)| PrioritySnapshot {
                priority,
                weight: class.weight,
                runners: class.runners,
                waiters: class.queue.len(),
                capacity: if class.queue.is_empty() {
                    0
                } else {
                    self.current_capacity(class.weight)
                },
                active: self.active.contains(priority),
            })
            .collect();
        LockSnapshot {
            concurrency: self.concurrency,
            available: self.available,
            running: self.concurrency - self.available,
            waiting: self.waiting,
            pending_weights: self.total_pending_weights,
            halted: self.halted,
            killed: self.killed,
            priorities,
        }
    }
}

impl fmt::Display for LockSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ concurrency={} available={} running={} waiting={} pending_weights={} ",
            self.concurrency, self.available, self.running, self.waiting, self.pending_weights
        )?;
        if self.killed {
            f.write_str("killed ")?;
        } else if self.halted {
            f.write_str("halted ")?;
        }
        for p in &self.priorities {
            write!(f, "{p} ")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for PrioritySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{priority={} weight={} run={} wait={} cap={}}}",
            self.priority, self.weight, self.runners, self.waiters, self.capacity
        )
    }
}
