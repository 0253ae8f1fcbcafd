//! Lock configuration.
//!
//! A [`PriorityLockConfig`] carries the total concurrency and one weight per
//! priority class. It can be built directly, deserialized with serde, or
//! parsed from the compact textual form `"1,2,4"` used in service flags.
//!
//! ```
//! use priority_multilock::PriorityLockConfig;
//!
//! let config = PriorityLockConfig::from_weights_str(8, "1, 2,4").unwrap();
//! assert_eq!(config.weights, vec![1, 2, 4]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a [`PriorityMultiLock`](crate::PriorityMultiLock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityLockConfig {
    /// Maximum simultaneous holders across all priorities.
    pub concurrency: usize,
    /// Weight per priority id; the id is the index.
    pub weights: Vec<u32>,
}

impl PriorityLockConfig {
    /// Creates a config from concurrency and weights without validating.
    #[must_use]
    pub fn new(concurrency: usize, weights: impl Into<Vec<u32>>) -> Self {
        Self {
            concurrency,
            weights: weights.into(),
        }
    }

    /// Parses a comma separated weight list such as `"1,2,4"`.
    ///
    /// Whitespace around tokens is ignored. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWeight`] for tokens that are not
    /// non-negative integers, and any error from [`validate`](Self::validate).
    pub fn from_weights_str(concurrency: usize, weights: &str) -> Result<Self, ConfigError> {
        let weights = parse_weights(weights)?;
        let config = Self::new(concurrency, weights);
        config.validate()?;
        Ok(config)
    }

    /// Checks that concurrency and every weight are positive.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.weights.is_empty() {
            return Err(ConfigError::NoPriorities);
        }
        if let Some(priority) = self.weights.iter().position(|&weight| weight == 0) {
            return Err(ConfigError::ZeroWeight { priority });
        }
        Ok(())
    }
}

fn parse_weights(text: &str) -> Result<Vec<u32>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .enumerate()
        .map(|(position, token)| {
            let token = token.trim();
            token.parse::<u32>().map_err(|_| ConfigError::InvalidWeight {
                position,
                token: token.to_string(),
            })
        })
        .collect()
}
