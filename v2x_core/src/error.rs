//! Error types for the surrogate safety core.
//!
//! The taxonomy is deliberately small: malformed input is rejected before
//! any state mutates, numerically degenerate input is never an error (it
//! resolves to sentinels in `kinematics`), and unknown-entity lookups are
//! "not yet seen" rather than failures.

use thiserror::Error;

/// Errors that can occur at the engine boundary.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Malformed or incomplete input; no state was mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required numeric field is NaN or infinite.
    #[error("non-finite value for {field}")]
    NonFinite { field: &'static str },
}

impl CoreError {
    /// Creates an invalid-input error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
