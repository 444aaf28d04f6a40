//! Error types for the data access layer
//!
//! Store failures fall in three groups:
//! - transport (the store could not be reached)
//! - constraint (the store refused the write)
//! - not found (the row is gone, e.g. deleted by another session)

use crate::table::Table;

/// Errors returned by a [`RemoteStore`](crate::RemoteStore)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network or connection failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Write rejected by the store (foreign key, uniqueness, ...)
    #[error("constraint violation on {table}: {message}")]
    Constraint { table: Table, message: String },

    /// Row does not exist
    #[error("{table} row not found: {id}")]
    NotFound { table: Table, id: String },

    /// Row could not be converted to or from its typed form
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create constraint error
    pub fn constraint(table: Table, message: impl Into<String>) -> Self {
        Self::Constraint {
            table,
            message: message.into(),
        }
    }

    /// Create not-found error
    pub fn not_found(table: Table, id: impl Into<String>) -> Self {
        Self::NotFound {
            table,
            id: id.into(),
        }
    }

    /// Check if the row was missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the failure happened before the store saw the request
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors moving an entity up or down among its siblings
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    /// Entity is not among the siblings
    #[error("{table} row {id} is not in the sibling list")]
    NotInList { table: Table, id: String },

    /// First write landed, second failed
    ///
    /// Order values may now be duplicated or gapped until the next move.
    #[error("reorder partially applied: {written} updated, {failed} not: {source}")]
    PartiallyApplied {
        written: String,
        failed: String,
        #[source]
        source: StoreError,
    },

    /// Nothing was written
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
