//! Error types for crudkit.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions (e.g. map [`CrudError::NotFound`] to an HTTP 404).
//! Input keys the policy refuses are not errors; they are dropped silently.

use thiserror::Error;

use crate::record::RecordId;
use crate::storage::StorageError;

/// Validation errors raised while building names, input, or configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field name '{name}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidFieldName {
        name: String,
    },

    #[error("Invalid table name '{name}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTableName {
        name: String,
    },

    #[error("Input payload must be a JSON object, got {actual}")]
    InputNotAnObject {
        actual: &'static str,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Top-level error type for crudkit.
#[derive(Debug, Error)]
pub enum CrudError {
    #[error("Record not found: {id}")]
    NotFound {
        id: RecordId,
    },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl CrudError {
    /// Creates a not-found error for `id`.
    #[must_use]
    pub fn not_found(id: RecordId) -> Self {
        Self::NotFound { id }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the requested record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the repository failed.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for crudkit operations.
pub type CrudResult<T> = Result<T, CrudError>;
