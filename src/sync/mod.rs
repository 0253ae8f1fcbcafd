//! Synchronization primitives used by the lock.
//!
//! # Primitives
//!
//! - [`Notify`]: Single-listener wake event with a stored permit
//!
//! Notifications fired with no listener are kept, never lost.

mod notify;

pub use notify::Notify;
