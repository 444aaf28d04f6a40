//! In-process store
//!
//! [`MemoryStore`] keeps every table in memory behind a lock. It enforces
//! the parent references and uniqueness rules the hosted schema declares,
//! supports atomic batch updates, and loads from or dumps to a JSON
//! snapshot keyed by table name.

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::remote::RemoteStore;
use crate::table::Table;
use crate::Row;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use ulid::Ulid;

type Rows = IndexMap<String, Row>;

/// Store holding all tables in memory
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Rows>>,
    batch: bool,
}

impl MemoryStore {
    /// Empty store with atomic batch updates
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            batch: true,
        }
    }

    /// Disable atomic batch updates
    ///
    /// `update_many` then falls back to sequential writes, like a store
    /// without transactions.
    #[must_use]
    pub fn without_batch(mut self) -> Self {
        self.batch = false;
        self
    }

    /// Load from a snapshot `{"sections": [...], "paths": [...], ...}`
    ///
    /// Rows without an `id` get one. Unknown table names are ignored with a
    /// warning.
    ///
    /// # Errors
    /// Returns [`StoreError::Serialization`] if the snapshot is not an object
    /// of arrays of objects.
    pub fn from_snapshot(snapshot: &Value) -> StoreResult<Self> {
        let store = Self::new();
        let tables: Map<String, Value> = serde_json::from_value(snapshot.clone())?;
        {
            let mut guard = store.tables.write();
            for (name, rows) in tables {
                let Ok(table) = name.parse::<Table>() else {
                    tracing::warn!(table = %name, "ignoring unknown table in snapshot");
                    continue;
                };
                let rows: Vec<Row> = serde_json::from_value(rows)?;
                let entry = guard.entry(table).or_default();
                for mut row in rows {
                    let id = row_id(&row).unwrap_or_else(new_id);
                    row.insert("id".into(), Value::String(id.clone()));
                    entry.insert(id, row);
                }
            }
        }
        Ok(store)
    }

    /// Dump every table to a snapshot
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let guard = self.tables.read();
        let mut out = Map::new();
        for table in Table::ALL {
            if let Some(rows) = guard.get(&table) {
                let rows = rows.values().cloned().map(Value::Object).collect();
                out.insert(table.as_str().to_string(), Value::Array(rows));
            }
        }
        Value::Object(out)
    }

    /// Number of rows in a table
    #[must_use]
    pub fn count(&self, table: Table) -> usize {
        self.tables.read().get(&table).map_or(0, IndexMap::len)
    }

    fn check_references(guard: &HashMap<Table, Rows>, table: Table, row: &Row) -> StoreResult<()> {
        let refs: &[(&str, Table)] = match table {
            Table::Paths => &[("section_id", Table::Sections)],
            Table::Levels => &[("path_id", Table::Paths)],
            Table::UserProgress => &[("user_id", Table::Profiles), ("level_id", Table::Levels)],
            Table::ActivityLog => &[("profile_id", Table::Profiles)],
            Table::Sections | Table::Profiles => &[],
        };
        for (column, parent) in refs {
            let Some(Value::String(id)) = row.get(*column) else {
                return Err(StoreError::constraint(table, format!("{column} is required")));
            };
            let exists = guard.get(parent).is_some_and(|rows| rows.contains_key(id));
            if !exists {
                return Err(StoreError::constraint(
                    table,
                    format!("{column} '{id}' does not reference an existing {parent} row"),
                ));
            }
        }
        Ok(())
    }

    fn check_unique(guard: &HashMap<Table, Rows>, table: Table, row: &Row) -> StoreResult<()> {
        if table != Table::UserProgress {
            return Ok(());
        }
        let key = |r: &Row| (r.get("user_id").cloned(), r.get("level_id").cloned());
        let candidate = key(row);
        let duplicate = guard.get(&table).is_some_and(|rows| {
            rows.values()
                .any(|r| r.get("id") != row.get("id") && key(r) == candidate)
        });
        if duplicate {
            return Err(StoreError::constraint(table, "level already completed by this user"));
        }
        Ok(())
    }

    fn merged(
        guard: &HashMap<Table, Rows>,
        table: Table,
        id: &str,
        partial: Row,
    ) -> StoreResult<Row> {
        let mut row = guard
            .get(&table)
            .and_then(|rows| rows.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(table, id))?;
        for (k, v) in partial {
            if k != "id" {
                row.insert(k, v);
            }
        }
        Self::check_references(guard, table, &row)?;
        Self::check_unique(guard, table, &row)?;
        Ok(row)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

fn row_id(row: &Row) -> Option<String> {
    row.get("id").and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        let guard = self.tables.read();
        let rows = guard.get(&table).map(|r| r.values().cloned().collect::<Vec<_>>());
        Ok(filter.apply(rows.unwrap_or_default()))
    }

    async fn get(&self, table: Table, id: &str) -> StoreResult<Row> {
        self.tables
            .read()
            .get(&table)
            .and_then(|rows| rows.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(table, id))
    }

    async fn create(&self, table: Table, mut fields: Row) -> StoreResult<Row> {
        let mut guard = self.tables.write();
        let id = row_id(&fields).unwrap_or_else(new_id);
        if guard.get(&table).is_some_and(|rows| rows.contains_key(&id)) {
            return Err(StoreError::constraint(table, format!("duplicate id '{id}'")));
        }
        fields.insert("id".into(), Value::String(id.clone()));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        Self::check_references(&guard, table, &fields)?;
        Self::check_unique(&guard, table, &fields)?;
        guard.entry(table).or_default().insert(id.clone(), fields.clone());
        tracing::debug!(%table, %id, "row created");
        Ok(fields)
    }

    async fn update(&self, table: Table, id: &str, partial: Row) -> StoreResult<Row> {
        let mut guard = self.tables.write();
        let row = Self::merged(&guard, table, id, partial)?;
        guard.entry(table).or_default().insert(id.to_string(), row.clone());
        tracing::debug!(%table, %id, "row updated");
        Ok(row)
    }

    async fn delete(&self, table: Table, id: &str) -> StoreResult<()> {
        let mut guard = self.tables.write();
        let removed = guard.get_mut(&table).and_then(|rows| rows.shift_remove(id));
        if removed.is_none() {
            return Err(StoreError::not_found(table, id));
        }
        tracing::debug!(%table, %id, "row deleted");
        Ok(())
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn update_many(&self, table: Table, updates: Vec<(String, Row)>) -> StoreResult<Vec<Row>> {
        if !self.batch {
            let mut out = Vec::with_capacity(updates.len());
            for (id, partial) in updates {
                out.push(self.update(table, &id, partial).await?);
            }
            return Ok(out);
        }
        let mut guard = self.tables.write();
        // Validate everything before writing anything.
        let mut staged = Vec::with_capacity(updates.len());
        for (id, partial) in updates {
            let row = Self::merged(&guard, table, &id, partial)?;
            staged.push((id, row));
        }
        let rows = guard.entry(table).or_default();
        let mut out = Vec::with_capacity(staged.len());
        for (id, row) in staged {
            rows.insert(id, row.clone());
            out.push(row);
        }
        tracing::debug!(%table, count = out.len(), "batch update applied");
        Ok(out)
    }
}
