//! priority-multilock: weighted fair-share admission control for async code.
//!
//! # Overview
//!
//! A [`PriorityMultiLock`] admits up to `concurrency` simultaneous holders of a
//! limited resource. Every caller names a priority class; each class has a
//! fixed weight, and while several classes are in demand each one is entitled
//! to a share of the slots proportional to its weight. Bulk work on a light
//! class cannot starve a heavy one, and a flood on a heavy class cannot shut a
//! light one out.
//!
//! # Core Guarantees
//!
//! - **No over-admission**: at most `concurrency` locks are ever outstanding
//! - **FIFO within a class**: waiters at one priority are granted in order
//! - **Release on drop**: a [`Lock`] returns its slot when the last clone goes
//! - **Cancel-safe acquisition**: dropping a pending [`LockFuture`] removes it
//!   from the queue
//! - **Executor agnostic**: the crate exposes futures and wakes wakers; it
//!   never spawns
//!
//! # Module Structure
//!
//! - [`lock`]: The admission lock, its handles, and the grant loop
//! - [`config`]: Validated construction parameters
//! - [`error`]: Error types
//!
//! Internal plumbing lives in crate-private modules: `channel` (the oneshot
//! channel carrying grants), `sync` (the wake event driving the grant loop),
//! and `util` (the index-based active list with its round-robin cursor).
//!
//! # Example
//!
//! ```
//! use priority_multilock::{LockError, PriorityMultiLock};
//! # futures_lite::future::block_on(async {
//! let (pml, grant_loop) = PriorityMultiLock::new(1, &[1, 1]).unwrap();
//! # drop(grant_loop);
//!
//! let held = pml.lock(0).await.unwrap();
//! let queued = pml.lock(1);
//! assert!(queued.is_queued());
//!
//! pml.kill();
//! assert_eq!(queued.await.unwrap_err(), LockError::Killed);
//! held.release();
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub(crate) mod channel;
pub mod config;
pub mod error;
pub mod lock;
pub(crate) mod sync;
pub(crate) mod util;

#[cfg(test)]
pub mod test_utils;

pub use config::PriorityLockConfig;
pub use error::{ConfigError, LockError, Result};
pub use lock::{GrantLoop, Lock, LockFuture, LockSnapshot, PriorityMultiLock, PrioritySnapshot};
