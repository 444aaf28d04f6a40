//! Editor errors
//!
//! Validation failures are caught before any network call; store failures
//! leave the buffer untouched so the session can retry or cancel.

use qb_document::{DocPath, EditError};
use qb_store::StoreError;
use std::fmt;

/// One invalid field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending field
    pub field: DocPath,
    /// What is wrong with it
    pub message: String,
}

impl FieldError {
    /// Create field error
    pub fn new(field: DocPath, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field that failed validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Record a failure
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Check if nothing failed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Failed fields
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Error for a specific field, for inline display
    #[must_use]
    pub fn for_field(&self, field: &DocPath) -> Option<&FieldError> {
        self.errors.iter().find(|e| &e.field == field)
    }

    /// `Ok` when empty
    ///
    /// # Errors
    /// Returns `self` when any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, e) in self.errors.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors from an edit session
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Buffer operation rejected
    #[error(transparent)]
    Edit(#[from] EditError),

    /// Required fields missing
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Commit failed at the store
    #[error("commit failed: {0}")]
    Store(#[from] StoreError),
}

impl EditorError {
    /// Check if the error was caught before reaching the store
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the store rejected or never received the commit
    #[inline]
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
