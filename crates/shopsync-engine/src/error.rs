//! Engine error types.

use thiserror::Error;

/// Errors that can occur during synchronization.
///
/// The taxonomy drives retry behavior: validation errors are rejected
/// before any state is written, transient errors are retried with backoff,
/// permanent errors fail the single unit without retry, and unrecoverable
/// errors fail the whole job.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed request rejected synchronously.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Network timeout, rate limit, or 5xx from either side. Retryable.
    #[error("Transient error: {message}")]
    Transient { message: String },

    /// 404 on a referenced id, schema failure. Not retried.
    #[error("Permanent error: {message}")]
    Permanent { message: String },

    /// The whole job cannot proceed, e.g. the full-sync target set
    /// cannot be enumerated.
    #[error("Unrecoverable job error: {message}")]
    Unrecoverable { message: String },

    /// A reconciliation attempt exceeded its deadline. Counts as transient.
    #[error("Reconciliation attempt exceeded its {seconds}s deadline")]
    Deadline { seconds: u64 },

    /// The per-resource advisory lock was not acquired within the bounded
    /// wait. The unit is requeued rather than blocking.
    #[error("Lock wait exceeded for {key}")]
    LockTimeout { key: String },

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] shopsync_store::StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Create an unrecoverable job error.
    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self::Unrecoverable {
            message: message.into(),
        }
    }

    /// Check if this error is retryable within a unit's attempt budget.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Transient { .. }
                | EngineError::Deadline { .. }
                | EngineError::LockTimeout { .. }
        )
    }

    /// Check if this error must fail the whole job.
    #[must_use]
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, EngineError::Unrecoverable { .. })
    }

    /// Short machine-readable code recorded in the job error log.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation",
            EngineError::Transient { .. } => "transient",
            EngineError::Permanent { .. } => "permanent",
            EngineError::Unrecoverable { .. } => "unrecoverable",
            EngineError::Deadline { .. } => "deadline",
            EngineError::LockTimeout { .. } => "lock_timeout",
            EngineError::Store(_) => "store",
            EngineError::Serialization(_) => "serialization",
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
