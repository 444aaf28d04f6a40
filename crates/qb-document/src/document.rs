//! Copy-on-write documents
//!
//! [`Document::apply`] never mutates the receiver. It clones the root
//! pointer and uses [`Arc::make_mut`] along the edited path, so only the
//! nodes on that path are copied and every untouched sibling stays the same
//! allocation in both the old and the new document.

use crate::node::{Node, NodeKind, NodeRef};
use crate::ops::{EditError, EditOp, RenameCollisionPolicy};
use crate::path::DocPath;
use crate::shape::Shape;
use serde_json::Value;
use std::sync::Arc;

/// Immutable nested document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: NodeRef,
}

impl Document {
    /// Wrap a root node
    #[inline]
    #[must_use]
    pub fn new(root: Node) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Decode JSON against a shape
    #[inline]
    #[must_use]
    pub fn decode(shape: &Shape, value: &Value) -> Self {
        Self::new(shape.decode(Some(value)))
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Serialize to JSON
    #[inline]
    #[must_use]
    pub fn to_json(&self) -> Value {
        self.root.to_json()
    }

    /// Node at path
    #[must_use]
    pub fn get(&self, path: &DocPath) -> Option<&NodeRef> {
        let mut current = &self.root;
        for seg in path.iter() {
            current = current.child(seg)?;
        }
        Some(current)
    }

    /// Check if two documents share the node at `path`
    ///
    /// True when both resolve to the same allocation, meaning no edit between
    /// them touched that subtree.
    #[must_use]
    pub fn shares(&self, other: &Self, path: &DocPath) -> bool {
        match (self.get(path), other.get(path)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Apply one operation, producing a new document
    ///
    /// # Errors
    /// Returns [`EditError`] when the target is missing, has the wrong kind,
    /// or the operation would break key uniqueness. A remove past the end of
    /// a list is not an error: the document comes back unchanged.
    pub fn apply(&self, op: &EditOp) -> Result<Self, EditError> {
        let mut root = Arc::clone(&self.root);
        match op {
            EditOp::AddListItem { path, value } => {
                list_mut(&mut root, path)?.push(Arc::new(value.clone()));
            }
            EditOp::RemoveListItem { path, index } => {
                let len = self.list(path)?.len();
                if *index >= len {
                    tracing::debug!(%path, index, len, "remove past end of list ignored");
                    return Ok(self.clone());
                }
                list_mut(&mut root, path)?.remove(*index);
            }
            EditOp::UpdateListItem { path, index, value } => {
                let items = list_mut(&mut root, path)?;
                let len = items.len();
                let slot = items.get_mut(*index).ok_or_else(|| EditError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                    len,
                })?;
                *slot = Arc::new(value.clone());
            }
            EditOp::AddMapEntry { path, key, value } => {
                if key.is_empty() {
                    return Err(EditError::EmptyKey(path.clone()));
                }
                if self.map(path)?.contains_key(key) {
                    return Err(EditError::KeyExists {
                        path: path.clone(),
                        key: key.clone(),
                    });
                }
                map_mut(&mut root, path)?.insert(key.clone(), Arc::new(value.clone()));
            }
            EditOp::RemoveMapEntry { path, key } => {
                if !self.map(path)?.contains_key(key) {
                    return Err(EditError::KeyNotFound {
                        path: path.clone(),
                        key: key.clone(),
                    });
                }
                map_mut(&mut root, path)?.shift_remove(key);
            }
            EditOp::UpdateMapValue { path, key, value } => {
                let entries = map_mut(&mut root, path)?;
                let slot = entries.get_mut(key).ok_or_else(|| EditError::KeyNotFound {
                    path: path.clone(),
                    key: key.clone(),
                })?;
                *slot = Arc::new(value.clone());
            }
            EditOp::RenameMapKey {
                path,
                from,
                to,
                policy,
            } => {
                let current = self.map(path)?;
                if !current.contains_key(from) {
                    return Err(EditError::KeyNotFound {
                        path: path.clone(),
                        key: from.clone(),
                    });
                }
                if to.is_empty() || to == from {
                    return Ok(self.clone());
                }
                let collides = current.contains_key(to);
                if collides && *policy == RenameCollisionPolicy::Reject {
                    return Err(EditError::KeyCollision {
                        path: path.clone(),
                        key: to.clone(),
                    });
                }
                let rebuilt = current
                    .iter()
                    .filter(|(k, _)| *k != to)
                    .map(|(k, v)| {
                        let key = if k == from { to.clone() } else { k.clone() };
                        (key, Arc::clone(v))
                    })
                    .collect();
                *map_mut(&mut root, path)? = rebuilt;
            }
            EditOp::SetField { path, field, value } => {
                let node = node_mut(&mut root, path)?;
                match node {
                    Node::Record(fields) => {
                        fields.insert(field.clone(), Arc::new(value.clone()));
                    }
                    other => {
                        return Err(EditError::KindMismatch {
                            path: path.clone(),
                            expected: NodeKind::Record,
                            found: other.kind(),
                        })
                    }
                }
            }
        }
        Ok(Self { root })
    }

    /// Apply operations in order, stopping at the first error
    ///
    /// # Errors
    /// Returns the first [`EditError`]; `self` is unaffected either way.
    pub fn apply_all<'a>(&self, ops: impl IntoIterator<Item = &'a EditOp>) -> Result<Self, EditError> {
        ops.into_iter().try_fold(self.clone(), |doc, op| doc.apply(op))
    }

    fn list(&self, path: &DocPath) -> Result<&[NodeRef], EditError> {
        let node = self
            .get(path)
            .ok_or_else(|| EditError::PathNotFound(path.clone()))?;
        node.as_list().ok_or_else(|| EditError::KindMismatch {
            path: path.clone(),
            expected: NodeKind::List,
            found: node.kind(),
        })
    }

    fn map(&self, path: &DocPath) -> Result<&crate::node::Entries, EditError> {
        let node = self
            .get(path)
            .ok_or_else(|| EditError::PathNotFound(path.clone()))?;
        match &**node {
            Node::Map(entries) => Ok(entries),
            other => Err(EditError::KindMismatch {
                path: path.clone(),
                expected: NodeKind::Map,
                found: other.kind(),
            }),
        }
    }
}

fn node_mut<'a>(root: &'a mut NodeRef, path: &DocPath) -> Result<&'a mut Node, EditError> {
    let mut current: &'a mut Node = Arc::make_mut(root);
    for (depth, seg) in path.iter().enumerate() {
        let node = current;
        let not_found = || EditError::PathNotFound(DocPath::from(path.segments()[..=depth].to_vec()));
        let next = match node {
            Node::List(items) => {
                let index = seg.parse::<usize>().map_err(|_| not_found())?;
                items.get_mut(index).ok_or_else(not_found)?
            }
            Node::Map(entries) | Node::Record(entries) => {
                entries.get_mut(seg).ok_or_else(not_found)?
            }
            _ => return Err(not_found()),
        };
        current = Arc::make_mut(next);
    }
    Ok(current)
}

fn list_mut<'a>(root: &'a mut NodeRef, path: &DocPath) -> Result<&'a mut Vec<NodeRef>, EditError> {
    match node_mut(root, path)? {
        Node::List(items) => Ok(items),
        other => Err(EditError::KindMismatch {
            path: path.clone(),
            expected: NodeKind::List,
            found: other.kind(),
        }),
    }
}

fn map_mut<'a>(
    root: &'a mut NodeRef,
    path: &DocPath,
) -> Result<&'a mut crate::node::Entries, EditError> {
    match node_mut(root, path)? {
        Node::Map(entries) => Ok(entries),
        other => Err(EditError::KindMismatch {
            path: path.clone(),
            expected: NodeKind::Map,
            found: other.kind(),
        }),
    }
}
