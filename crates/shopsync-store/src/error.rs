//! Store error types.

use thiserror::Error;

/// Errors raised by the record, job, inventory and conflict stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness invariant would be violated.
    #[error("Duplicate {entity} key: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    /// An entity may be linked to an authority id exactly once.
    #[error("Record already linked to authority id {existing}")]
    AlreadyLinked { existing: String },

    /// Illegal state machine transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Jobs in a terminal status are immutable.
    #[error("Job {id} is terminal and cannot be mutated")]
    TerminalJob { id: String },

    /// Malformed input rejected before any state was written.
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl StoreError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
