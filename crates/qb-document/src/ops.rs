//! Edit operations on nested documents
//!
//! Provides [`EditOp`], the closed set of structural edits the editor can
//! perform. Operations are values: they are built by the caller, applied by
//! [`Document::apply`](crate::Document::apply), and logged by description.

use crate::node::{Node, NodeKind};
use crate::path::DocPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when a key rename targets a key that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameCollisionPolicy {
    /// Refuse the rename and leave the map untouched
    #[default]
    Reject,
    /// Drop the existing entry and put the renamed one in its old position
    Overwrite,
}

/// Structural edit targeting a node inside a document
///
/// # Invariants
/// - `path` addresses the container (list, map or record), never the item
/// - Map keys stay unique after every operation
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Append `value` to the list at `path`
    AddListItem { path: DocPath, value: Node },

    /// Remove the item at `index`; out of range is a no-op
    RemoveListItem { path: DocPath, index: usize },

    /// Replace the item at `index`
    UpdateListItem {
        path: DocPath,
        index: usize,
        value: Node,
    },

    /// Insert a new entry into the map at `path`
    ///
    /// Fails if `key` already exists.
    AddMapEntry {
        path: DocPath,
        key: String,
        value: Node,
    },

    /// Delete the entry under `key`
    RemoveMapEntry { path: DocPath, key: String },

    /// Replace the value under an existing `key`
    UpdateMapValue {
        path: DocPath,
        key: String,
        value: Node,
    },

    /// Replace key `from` with `to`, keeping value and position
    ///
    /// An empty `to`, or `to == from`, leaves the map unchanged.
    RenameMapKey {
        path: DocPath,
        from: String,
        to: String,
        policy: RenameCollisionPolicy,
    },

    /// Set a field of the record at `path`
    SetField {
        path: DocPath,
        field: String,
        value: Node,
    },
}

impl EditOp {
    /// Container this operation targets
    #[inline]
    #[must_use]
    pub fn target(&self) -> &DocPath {
        match self {
            Self::AddListItem { path, .. }
            | Self::RemoveListItem { path, .. }
            | Self::UpdateListItem { path, .. }
            | Self::AddMapEntry { path, .. }
            | Self::RemoveMapEntry { path, .. }
            | Self::UpdateMapValue { path, .. }
            | Self::RenameMapKey { path, .. }
            | Self::SetField { path, .. } => path,
        }
    }

    /// Check if the operation changes which keys or indices exist
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Self::UpdateListItem { .. } | Self::UpdateMapValue { .. } | Self::SetField { .. }
        )
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddListItem { path, .. } => write!(f, "add item to {path}"),
            Self::RemoveListItem { path, index } => write!(f, "remove {path}/{index}"),
            Self::UpdateListItem { path, index, .. } => write!(f, "update {path}/{index}"),
            Self::AddMapEntry { path, key, .. } => write!(f, "add entry '{key}' to {path}"),
            Self::RemoveMapEntry { path, key } => write!(f, "remove entry '{key}' from {path}"),
            Self::UpdateMapValue { path, key, .. } => write!(f, "update entry '{key}' in {path}"),
            Self::RenameMapKey { path, from, to, .. } => {
                write!(f, "rename '{from}' to '{to}' in {path}")
            }
            Self::SetField { path, field, .. } => write!(f, "set field '{field}' of {path}"),
        }
    }
}

/// Errors applying an edit operation
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EditError {
    /// Nothing at path
    #[error("path not found: {0}")]
    PathNotFound(DocPath),

    /// Node has the wrong shape for the operation
    #[error("expected {expected} at '{path}', found {found}")]
    KindMismatch {
        path: DocPath,
        expected: NodeKind,
        found: NodeKind,
    },

    /// List index past the end
    #[error("index {index} out of bounds for list of length {len} at '{path}'")]
    IndexOutOfBounds {
        path: DocPath,
        index: usize,
        len: usize,
    },

    /// Map key not present
    #[error("key '{key}' not found in '{path}'")]
    KeyNotFound { path: DocPath, key: String },

    /// Map key already present
    #[error("key '{key}' already exists in '{path}'")]
    KeyExists { path: DocPath, key: String },

    /// Rename target already taken
    #[error("cannot rename to '{key}' in '{path}': key already in use")]
    KeyCollision { path: DocPath, key: String },

    /// Map keys must not be empty
    #[error("empty key in '{0}'")]
    EmptyKey(DocPath),
}

impl EditError {
    /// Path the error refers to
    #[must_use]
    pub fn path(&self) -> &DocPath {
        match self {
            Self::PathNotFound(path) | Self::EmptyKey(path) => path,
            Self::KindMismatch { path, .. }
            | Self::IndexOutOfBounds { path, .. }
            | Self::KeyNotFound { path, .. }
            | Self::KeyExists { path, .. }
            | Self::KeyCollision { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_target_and_display() {
        let op = EditOp::RenameMapKey {
            path: "/time_investment/breakdown".parse().unwrap(),
            from: "design".into(),
            to: "frontend".into(),
            policy: RenameCollisionPolicy::Reject,
        };
        assert_eq!(op.target().to_string(), "/time_investment/breakdown");
        assert_eq!(
            op.to_string(),
            "rename 'design' to 'frontend' in /time_investment/breakdown"
        );
    }

    #[test]
    fn op_is_structural() {
        let path = DocPath::single("process");
        assert!(EditOp::RemoveListItem { path: path.clone(), index: 0 }.is_structural());
        assert!(!EditOp::UpdateListItem {
            path,
            index: 0,
            value: Node::text("x")
        }
        .is_structural());
    }

    #[test]
    fn policy_serde_names() {
        let json = serde_json::to_string(&RenameCollisionPolicy::Overwrite).unwrap();
        assert_eq!(json, "\"overwrite\"");
        assert_eq!(RenameCollisionPolicy::default(), RenameCollisionPolicy::Reject);
    }

    #[test]
    fn error_reports_path() {
        let err = EditError::KeyCollision {
            path: DocPath::single("breakdown"),
            key: "design".into(),
        };
        assert_eq!(err.path().to_string(), "/breakdown");
        assert!(err.to_string().contains("already in use"));
    }
}
