//! Edit buffer
//!
//! Holds the last committed document, the working copy, and renames that
//! are in progress. Every operation here is a pure transform of the working
//! copy; nothing reaches the store from this module.

use qb_document::{generate_key, DocPath, Document, EditError, EditOp, Node, RenameCollisionPolicy};
use std::collections::HashMap;

/// Key of an in-progress rename: the map and the entry's current key
pub type PendingKey = (DocPath, String);

/// Result of reconciling a rename on focus loss
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Entry now lives under `to`
    Renamed {
        from: String,
        to: String,
        /// An existing entry under `to` was dropped
        replaced: bool,
    },
    /// Proposal was empty or equal to the current key
    Unchanged,
    /// `to` is taken and the policy refuses to overwrite it
    Rejected { to: String },
    /// No rename was in progress for this key
    NoPending,
}

/// Committed document, working copy and pending renames
#[derive(Debug, Clone)]
pub struct EditBuffer {
    committed: Document,
    buffer: Document,
    pending_key_edits: HashMap<PendingKey, String>,
    policy: RenameCollisionPolicy,
}

impl EditBuffer {
    /// Open a buffer on a committed document
    #[must_use]
    pub fn new(committed: Document, policy: RenameCollisionPolicy) -> Self {
        Self {
            buffer: committed.clone(),
            committed,
            pending_key_edits: HashMap::new(),
            policy,
        }
    }

    /// Last value accepted by the store
    #[inline]
    #[must_use]
    pub fn committed(&self) -> &Document {
        &self.committed
    }

    /// Working copy
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &Document {
        &self.buffer
    }

    /// Check if the working copy differs from the committed document
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.buffer != self.committed
    }

    /// Check if the buffer has neither edits nor renames in progress
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.is_dirty() && self.pending_key_edits.is_empty()
    }

    /// Number of renames in progress
    #[must_use]
    pub fn pending_renames(&self) -> usize {
        self.pending_key_edits.len()
    }

    /// Apply a raw operation to the working copy
    ///
    /// # Errors
    /// Returns the [`EditError`] of the operation; the buffer is unchanged.
    pub fn apply(&mut self, op: &EditOp) -> Result<(), EditError> {
        self.buffer = self.buffer.apply(op)?;
        if let EditOp::RemoveMapEntry { path, key } = op {
            self.discard_renames_under(path, key);
        }
        tracing::trace!(op = %op, "buffer edited");
        Ok(())
    }

    /// Append to a list
    ///
    /// # Errors
    /// Missing path or not a list.
    pub fn add_list_item(&mut self, path: &DocPath, value: Node) -> Result<(), EditError> {
        self.apply(&EditOp::AddListItem {
            path: path.clone(),
            value,
        })
    }

    /// Remove a list item; out of range does nothing
    ///
    /// # Errors
    /// Missing path or not a list.
    pub fn remove_list_item(&mut self, path: &DocPath, index: usize) -> Result<(), EditError> {
        self.apply(&EditOp::RemoveListItem {
            path: path.clone(),
            index,
        })
    }

    /// Replace a list item
    ///
    /// # Errors
    /// Missing path, not a list, or index out of range.
    pub fn update_list_item(
        &mut self,
        path: &DocPath,
        index: usize,
        value: Node,
    ) -> Result<(), EditError> {
        self.apply(&EditOp::UpdateListItem {
            path: path.clone(),
            index,
            value,
        })
    }

    /// Insert an entry under a generated `{prefix}_…` key, returning the key
    ///
    /// # Errors
    /// Missing path or not a map.
    pub fn add_map_entry(
        &mut self,
        path: &DocPath,
        prefix: &str,
        value: Node,
    ) -> Result<String, EditError> {
        let key = {
            let entries = self
                .buffer
                .get(path)
                .ok_or_else(|| EditError::PathNotFound(path.clone()))?
                .as_entries()
                .cloned()
                .unwrap_or_default();
            generate_key(prefix, &entries)
        };
        self.apply(&EditOp::AddMapEntry {
            path: path.clone(),
            key: key.clone(),
            value,
        })?;
        Ok(key)
    }

    /// Delete an entry and any rename in progress for it
    ///
    /// # Errors
    /// Missing path, not a map, or no such key.
    pub fn remove_map_entry(&mut self, path: &DocPath, key: &str) -> Result<(), EditError> {
        self.apply(&EditOp::RemoveMapEntry {
            path: path.clone(),
            key: key.to_string(),
        })
    }

    /// Replace the value under a key
    ///
    /// # Errors
    /// Missing path, not a map, or no such key.
    pub fn update_map_value(&mut self, path: &DocPath, key: &str, value: Node) -> Result<(), EditError> {
        self.apply(&EditOp::UpdateMapValue {
            path: path.clone(),
            key: key.to_string(),
            value,
        })
    }

    /// Set a record field
    ///
    /// # Errors
    /// Missing path or not a record.
    pub fn set_field(&mut self, path: &DocPath, field: &str, value: Node) -> Result<(), EditError> {
        self.apply(&EditOp::SetField {
            path: path.clone(),
            field: field.to_string(),
            value,
        })
    }

    /// Record a proposed key while its input has focus
    ///
    /// The map itself is not touched.
    ///
    /// # Errors
    /// Missing path, not a map, or `old_key` not in the map.
    pub fn begin_key_rename(
        &mut self,
        path: &DocPath,
        old_key: &str,
        proposed: impl Into<String>,
    ) -> Result<(), EditError> {
        let exists = match self.buffer.get(path) {
            Some(node) => match &**node {
                Node::Map(entries) => entries.contains_key(old_key),
                other => {
                    return Err(EditError::KindMismatch {
                        path: path.clone(),
                        expected: qb_document::NodeKind::Map,
                        found: other.kind(),
                    })
                }
            },
            None => return Err(EditError::PathNotFound(path.clone())),
        };
        if !exists {
            return Err(EditError::KeyNotFound {
                path: path.clone(),
                key: old_key.to_string(),
            });
        }
        self.pending_key_edits
            .insert((path.clone(), old_key.to_string()), proposed.into());
        Ok(())
    }

    /// Key to show for an entry: the proposal if one is in progress
    #[must_use]
    pub fn display_key<'a>(&'a self, path: &DocPath, old_key: &'a str) -> &'a str {
        self.pending_key_edits
            .get(&(path.clone(), old_key.to_string()))
            .map_or(old_key, String::as_str)
    }

    /// Reconcile a rename on focus loss
    ///
    /// The pending proposal is cleared whatever the outcome.
    ///
    /// # Errors
    /// Returns [`EditError`] if the map or the old key has gone away since
    /// the rename began.
    pub fn commit_key_rename(&mut self, path: &DocPath, old_key: &str) -> Result<RenameOutcome, EditError> {
        let Some(proposed) = self
            .pending_key_edits
            .remove(&(path.clone(), old_key.to_string()))
        else {
            return Ok(RenameOutcome::NoPending);
        };
        if proposed.is_empty() || proposed == old_key {
            return Ok(RenameOutcome::Unchanged);
        }

        let replaced = self
            .buffer
            .get(path)
            .and_then(|n| n.as_entries())
            .is_some_and(|e| e.contains_key(&proposed));
        let op = EditOp::RenameMapKey {
            path: path.clone(),
            from: old_key.to_string(),
            to: proposed.clone(),
            policy: self.policy,
        };
        match self.buffer.apply(&op) {
            Ok(next) => {
                self.buffer = next;
                // An overwritten entry is gone, along with its renames.
                if replaced {
                    self.discard_renames_under(path, &proposed);
                }
                // Renames nested under the old key now live under the new one.
                self.rekey_renames_under(path, old_key, &proposed);
                tracing::debug!(%path, from = old_key, to = %proposed, replaced, "key renamed");
                Ok(RenameOutcome::Renamed {
                    from: old_key.to_string(),
                    to: proposed,
                    replaced,
                })
            }
            Err(EditError::KeyCollision { key, .. }) => {
                tracing::warn!(%path, from = old_key, to = %key, "rename rejected: key already in use");
                Ok(RenameOutcome::Rejected { to: key })
            }
            Err(e) => Err(e),
        }
    }

    /// Discard all edits and renames, returning to the committed document
    pub fn cancel(&mut self) {
        self.buffer = self.committed.clone();
        self.pending_key_edits.clear();
    }

    /// Record that `sent` was accepted by the store
    ///
    /// The working copy is kept: edits made while the write was in flight
    /// stay in the buffer.
    pub fn mark_committed(&mut self, sent: Document) {
        self.committed = sent;
    }

    /// Take a fresh value from the store
    ///
    /// The committed baseline always moves to `fresh`. The working copy is
    /// replaced only when idle, so local edits are never lost. Returns
    /// whether the working copy was replaced.
    pub fn refresh(&mut self, fresh: Document) -> bool {
        let idle = self.is_idle();
        if idle {
            self.buffer = fresh.clone();
        }
        self.committed = fresh;
        idle
    }

    fn discard_renames_under(&mut self, path: &DocPath, key: &str) {
        let entry_path = path.child(key);
        self.pending_key_edits.retain(|(map, old), _| {
            !((map == path && old == key) || entry_path.is_prefix_of(map))
        });
    }

    fn rekey_renames_under(&mut self, path: &DocPath, old_key: &str, new_key: &str) {
        let old_entry = path.child(old_key);
        let new_entry = path.child(new_key);
        let moved: Vec<_> = self
            .pending_key_edits
            .keys()
            .filter(|(map, _)| old_entry.is_prefix_of(map))
            .cloned()
            .collect();
        for (map, key) in moved {
            if let Some(proposal) = self.pending_key_edits.remove(&(map.clone(), key.clone())) {
                let rest = map.relative_to(&old_entry).unwrap_or_default();
                let rebased = new_entry.extend(rest.segments());
                self.pending_key_edits.insert((rebased, key), proposal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qb_document::{decode_level, ListField, MapField};
    use serde_json::json;

    fn buffer() -> EditBuffer {
        let doc = decode_level(&json!({
            "title": "Intro",
            "process": ["a", "b", "c"],
            "time_investment": {
                "breakdown": {"design": "2 hours", "build": "4 hours"},
                "totals": {"dev": {"total": "6 hours", "details": {"code": "5 hours"}}}
            }
        }));
        EditBuffer::new(doc, RenameCollisionPolicy::Reject)
    }

    fn breakdown(b: &EditBuffer) -> serde_json::Value {
        b.buffer().get(&MapField::Breakdown.path()).unwrap().to_json()
    }

    #[test]
    fn remove_list_item_scenario() {
        let mut b = buffer();
        b.remove_list_item(&ListField::ProcessSteps.path(), 1).unwrap();
        assert_eq!(b.buffer().to_json()["process"], json!(["a", "c"]));
        assert_eq!(b.committed().to_json()["process"], json!(["a", "b", "c"]));
    }

    #[test]
    fn rename_is_two_phase() {
        let mut b = buffer();
        let path = MapField::Breakdown.path();
        b.begin_key_rename(&path, "design", "fronte").unwrap();
        b.begin_key_rename(&path, "design", "frontend").unwrap();

        assert_eq!(b.display_key(&path, "design"), "frontend");
        assert_eq!(b.display_key(&path, "build"), "build");
        // Map untouched while focused.
        assert!(breakdown(&b).get("design").is_some());

        let outcome = b.commit_key_rename(&path, "design").unwrap();
        assert_eq!(
            outcome,
            RenameOutcome::Renamed { from: "design".into(), to: "frontend".into(), replaced: false }
        );
        assert_eq!(breakdown(&b), json!({"frontend": "2 hours", "build": "4 hours"}));
        assert_eq!(b.pending_renames(), 0);
    }

    #[test]
    fn colliding_rename_is_rejected_and_cleared() {
        let mut b = buffer();
        let path = MapField::Breakdown.path();
        b.begin_key_rename(&path, "design", "build").unwrap();
        let outcome = b.commit_key_rename(&path, "design").unwrap();
        assert_eq!(outcome, RenameOutcome::Rejected { to: "build".into() });
        assert_eq!(breakdown(&b), json!({"design": "2 hours", "build": "4 hours"}));
        assert_eq!(b.pending_renames(), 0);
        assert!(!b.is_dirty());
    }

    #[test]
    fn colliding_rename_with_overwrite_policy() {
        let mut b = buffer();
        b.policy = RenameCollisionPolicy::Overwrite;
        let path = MapField::Breakdown.path();
        b.begin_key_rename(&path, "design", "build").unwrap();
        let outcome = b.commit_key_rename(&path, "design").unwrap();
        assert_eq!(
            outcome,
            RenameOutcome::Renamed { from: "design".into(), to: "build".into(), replaced: true }
        );
        assert_eq!(breakdown(&b), json!({"build": "2 hours"}));
    }

    #[test]
    fn overwrite_drops_renames_of_the_replaced_entry() {
        let mut b = buffer();
        b.policy = RenameCollisionPolicy::Overwrite;
        let path = MapField::Breakdown.path();
        b.begin_key_rename(&path, "build", "x").unwrap();
        b.begin_key_rename(&path, "design", "build").unwrap();
        let outcome = b.commit_key_rename(&path, "design").unwrap();
        assert!(matches!(outcome, RenameOutcome::Renamed { replaced: true, .. }));
        assert_eq!(breakdown(&b), json!({"build": "2 hours"}));
        assert_eq!(b.display_key(&path, "build"), "build");
        assert_eq!(b.pending_renames(), 0);
        assert_eq!(b.commit_key_rename(&path, "build").unwrap(), RenameOutcome::NoPending);
    }

    #[test]
    fn empty_or_same_proposal_is_unchanged() {
        let mut b = buffer();
        let path = MapField::Breakdown.path();
        b.begin_key_rename(&path, "design", "").unwrap();
        assert_eq!(b.commit_key_rename(&path, "design").unwrap(), RenameOutcome::Unchanged);
        b.begin_key_rename(&path, "design", "design").unwrap();
        assert_eq!(b.commit_key_rename(&path, "design").unwrap(), RenameOutcome::Unchanged);
        assert_eq!(b.commit_key_rename(&path, "design").unwrap(), RenameOutcome::NoPending);
        assert!(b.is_idle());
    }

    #[test]
    fn begin_rename_of_missing_key_fails() {
        let mut b = buffer();
        let err = b
            .begin_key_rename(&MapField::Breakdown.path(), "nope", "x")
            .unwrap_err();
        assert!(matches!(err, EditError::KeyNotFound { .. }));
    }

    #[test]
    fn removing_entry_discards_its_renames() {
        let mut b = buffer();
        let totals = MapField::RoleTotals.path();
        let details = MapField::RoleDetails { role: "dev".into() }.path();
        b.begin_key_rename(&totals, "dev", "engineering").unwrap();
        b.begin_key_rename(&details, "code", "coding").unwrap();
        assert_eq!(b.pending_renames(), 2);

        b.remove_map_entry(&totals, "dev").unwrap();
        assert_eq!(b.pending_renames(), 0);
    }

    #[test]
    fn nested_renames_follow_renamed_parent() {
        let mut b = buffer();
        let totals = MapField::RoleTotals.path();
        let old_details = MapField::RoleDetails { role: "dev".into() }.path();
        b.begin_key_rename(&old_details, "code", "coding").unwrap();
        b.begin_key_rename(&totals, "dev", "engineering").unwrap();
        b.commit_key_rename(&totals, "dev").unwrap();

        let new_details = MapField::RoleDetails { role: "engineering".into() }.path();
        assert_eq!(b.display_key(&new_details, "code"), "coding");
        b.commit_key_rename(&new_details, "code").unwrap();
        assert_eq!(
            b.buffer().get(&new_details).unwrap().to_json(),
            json!({"coding": "5 hours"})
        );
    }

    #[test]
    fn generated_keys_are_unique() {
        let mut b = buffer();
        let path = MapField::Breakdown.path();
        let k1 = b.add_map_entry(&path, "new_item", MapField::Breakdown.default_value()).unwrap();
        let k2 = b.add_map_entry(&path, "new_item", MapField::Breakdown.default_value()).unwrap();
        assert_ne!(k1, k2);
        let map = breakdown(&b);
        assert_eq!(map.as_object().unwrap().len(), 4);
        assert_eq!(map[&k1], json!("0 hours"));
        assert_eq!(map[&k2], json!("0 hours"));
    }

    #[test]
    fn cancel_restores_committed() {
        let mut b = buffer();
        b.add_list_item(&ListField::FocusPoints.path(), Node::text("clarity")).unwrap();
        b.set_field(&DocPath::root(), "title", Node::text("Changed")).unwrap();
        b.begin_key_rename(&MapField::Breakdown.path(), "design", "x").unwrap();
        b.cancel();
        assert_eq!(b.buffer(), b.committed());
        assert!(b.is_idle());
    }

    #[test]
    fn refresh_respects_local_edits() {
        let mut b = buffer();
        let fresh = decode_level(&json!({"title": "Server"}));

        b.set_field(&DocPath::root(), "title", Node::text("Local")).unwrap();
        assert!(!b.refresh(fresh.clone()));
        assert_eq!(b.buffer().to_json()["title"], json!("Local"));
        assert_eq!(b.committed(), &fresh);

        b.cancel();
        assert_eq!(b.buffer().to_json()["title"], json!("Server"));
        assert!(b.refresh(decode_level(&json!({"title": "Newer"}))));
        assert_eq!(b.buffer().to_json()["title"], json!("Newer"));
    }
}
