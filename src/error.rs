//! Error types for admission and configuration.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Admission failures are decided synchronously at `lock()` time or by the
//!   instance being killed while a caller waits
//! - Releasing a granted lock never fails
//!
//! Waiters queued when an instance is *halted* (as opposed to killed) are not
//! failed at all: they never resume. That outcome is deliberate and has no
//! error variant.

/// Error returned by a lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LockError {
    /// The lock was killed, either before the request or while it waited.
    ///
    /// Also delivered to waiters still queued when the last owner of the
    /// instance goes away.
    #[error("priority lock killed; request abandoned")]
    Killed,
}

/// Error returned when a lock configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Concurrency must admit at least one holder.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    /// At least one priority class is required.
    #[error("weight list is empty; at least one priority is required")]
    NoPriorities,
    /// Every weight must be positive.
    #[error("priority {priority} has weight 0; weights must be positive")]
    ZeroWeight {
        /// Offending priority id.
        priority: usize,
    },
    /// A weight token in a textual weight list did not parse.
    #[error("invalid weight {token:?} at position {position}")]
    InvalidWeight {
        /// Position of the token in the list.
        position: usize,
        /// The token as written.
        token: String,
    },
}

/// Result alias for lock requests.
pub type Result<T> = std::result::Result<T, LockError>;
