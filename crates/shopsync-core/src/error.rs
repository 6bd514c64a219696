//! Core error types.

use thiserror::Error;

/// Errors raised by core types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A field mapping references a platform field outside the allowed set.
    #[error("Unknown platform field in mapping: {field}")]
    UnknownPlatformField { field: String },

    /// A field mapping has an empty authority-side field name.
    #[error("Empty authority field for platform field: {field}")]
    EmptyAuthorityField { field: String },

    /// Two platform fields map to the same authority field.
    #[error("Duplicate authority field in mapping: {field}")]
    DuplicateAuthorityField { field: String },

    /// A string value could not be parsed into an enum.
    #[error("Invalid value for {kind}: {value}")]
    InvalidValue { kind: &'static str, value: String },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
