//! Error types for questboard core
//!
//! Covers:
//! - Invalid input caught before any store call
//! - Store, reorder and editor failures passed up unchanged
//! - Admin-only intents issued from a viewer session
//! - Unreadable configuration

use qb_editor::EditorError;
use qb_store::{ReorderError, StoreError};

/// Main core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Required input missing or malformed
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    /// Intent needs an admin session
    #[error("admin session required")]
    NotAdmin,

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Move could not be completed
    #[error("reorder failed: {0}")]
    Reorder(#[from] ReorderError),

    /// Editor failure
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub(crate) fn required(field: &'static str) -> Self {
        Self::Invalid {
            field,
            message: "is required".to_string(),
        }
    }

    /// Check if the error was caught before reaching the store
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Invalid { .. } => true,
            Self::Editor(e) => e.is_validation(),
            _ => false,
        }
    }

    /// Check if a referenced row does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) => e.is_not_found(),
            Self::Reorder(ReorderError::Store(e)) => e.is_not_found(),
            Self::Reorder(ReorderError::NotInList { .. }) => true,
            _ => false,
        }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
