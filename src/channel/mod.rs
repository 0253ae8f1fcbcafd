//! Channel primitives used to hand grants to waiting callers.
//!
//! # Cancel Safety
//!
//! - Dropping the sender unsent wakes the receiver with a closed error
//! - Dropping the receiver drops any value that was delivered but not taken
//!
//! # Module Contents
//!
//! - [`oneshot`]: Single-value, single-use channel

pub mod oneshot;
