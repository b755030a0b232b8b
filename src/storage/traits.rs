//! Abstract repository trait for crudkit.
//!
//! A repository is bound to one record type and owns persistence for it.
//! By using a trait, we enable:
//! - In-memory backends for testing and embedded use
//! - SQL-backed backends for production
//! - Adapters over an application's existing data layer

use thiserror::Error;

use crate::field::{FieldName, FieldSet};
use crate::record::{Record, RecordId};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// Schema could not be read or is unusable.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// SQLite driver error.
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Persistence contract for one record type.
///
/// # Consistency
/// - `save` is expected to be atomic for a single record
/// - Whether concurrent saves are last-write-wins is up to the implementation
pub trait Repository: Send + Sync {
    /// The record type this repository persists.
    type Record: Record;

    /// Every column of the bound record type, in schema order.
    fn schema_fields(&self) -> Result<FieldSet, StorageError>;

    /// The column that identifies a record. Never writable from input.
    fn primary_key(&self) -> Result<FieldName, StorageError>;

    /// A fresh, unsaved record with every column at its default.
    fn new_record(&self) -> Result<Self::Record, StorageError>;

    /// Every stored record.
    fn list_all(&self) -> Result<Vec<Self::Record>, StorageError>;

    /// Get a record by primary key.
    fn find_by_id(&self, id: &RecordId) -> Result<Option<Self::Record>, StorageError>;

    /// Insert or update a record, returning it as stored.
    ///
    /// A record without an id is inserted and receives one.
    fn save(&self, record: Self::Record) -> Result<Self::Record, StorageError>;

    /// Delete a stored record. Returns `NotFound` if it is not stored.
    fn delete(&self, record: &Self::Record) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DynamicRecord;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_repository_object_safe(_: &dyn Repository<Record = DynamicRecord>) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotFound(RecordId::Int(3));
        assert!(err.to_string().contains("Record not found: 3"));

        let err = StorageError::Backend("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
