//! Level editing shortcuts
//!
//! Thin layer over [`EditSession`] naming the collections of a Level
//! document, so callers never spell out paths or default values.

use crate::error::EditorError;
use crate::session::{EditSession, EditorConfig};
use qb_document::{decode_level, DocPath, ListField, MapField, Node};
use qb_store::{RemoteStore, Table};
use std::sync::Arc;

impl EditSession {
    /// Open a session on a stored Level
    ///
    /// # Errors
    /// Returns [`EditorError::Store`] if the level cannot be fetched.
    pub async fn open_level(
        store: Arc<dyn RemoteStore>,
        id: &str,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        Self::open(store, Table::Levels, id, decode_level, config).await
    }

    /// Append a default item to a list field
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the document lacks the list.
    pub fn add_item(&self, field: ListField) -> Result<(), EditorError> {
        self.add_list_item(&field.path(), field.default_item())
    }

    /// Append an empty process step
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the document lacks `process`.
    pub fn add_process_step(&self) -> Result<(), EditorError> {
        self.add_item(ListField::ProcessSteps)
    }

    /// Append an empty assessment focus point
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the document lacks the list.
    pub fn add_focus_point(&self) -> Result<(), EditorError> {
        self.add_item(ListField::FocusPoints)
    }

    /// Remove an item from a list field; out of range does nothing
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the document lacks the list.
    pub fn remove_item(&self, field: ListField, index: usize) -> Result<(), EditorError> {
        self.remove_list_item(&field.path(), index)
    }

    /// Replace an item of a list field
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `index` is out of range.
    pub fn update_item(&self, field: ListField, index: usize, value: Node) -> Result<(), EditorError> {
        self.update_list_item(&field.path(), index, value)
    }

    /// Set one text field of the Level, e.g. `title`
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the root is not a record.
    pub fn set_text(&self, field: &str, value: impl Into<String>) -> Result<(), EditorError> {
        self.set_field(&DocPath::root(), field, Node::text(value))
    }

    /// Add a map entry with a generated key and the field's default value
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the map does not exist.
    pub fn add_entry(&self, field: &MapField) -> Result<String, EditorError> {
        self.add_map_entry(&field.path(), field.key_prefix(), field.default_value())
    }

    /// Add a breakdown activity, returning its placeholder key
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the breakdown map is missing.
    pub fn add_breakdown_item(&self) -> Result<String, EditorError> {
        self.add_entry(&MapField::Breakdown)
    }

    /// Add a role with an empty total and no details
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the totals map is missing.
    pub fn add_role(&self) -> Result<String, EditorError> {
        self.add_entry(&MapField::RoleTotals)
    }

    /// Add a detail line under `role`
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `role` does not exist.
    pub fn add_role_detail(&self, role: &str) -> Result<String, EditorError> {
        self.add_entry(&MapField::RoleDetails { role: role.to_string() })
    }

    /// Set the total duration of a role
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `role` does not exist.
    pub fn set_role_total(&self, role: &str, total: impl Into<String>) -> Result<(), EditorError> {
        let path = MapField::RoleTotals.path().child(role);
        self.set_field(&path, "total", Node::text(total))
    }
}
