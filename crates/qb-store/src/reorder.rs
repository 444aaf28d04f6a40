//! Moving entities up or down among their siblings
//!
//! A move swaps the order value of the entity with that of its neighbour in
//! the sorted sibling list. Stores with atomic batches get both writes in one
//! call. Otherwise the neighbour is written first and the moved entity
//! second; if the second write fails the first stays applied and
//! [`ReorderError::PartiallyApplied`] says so. Listings sort by
//! `(order, id)`, so the duplicate value left behind is still displayed in a
//! stable order and the next move repairs it.

use crate::error::{ReorderError, StoreError};
use crate::filter::{compare_values, Filter};
use crate::remote::RemoteStore;
use crate::table::Table;
use crate::Row;
use serde_json::Value;
use std::cmp::Ordering;

/// Direction of a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the start of the list
    Up,
    /// Toward the end of the list
    Down,
}

/// Result of a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Order values were swapped with the neighbour
    Moved {
        neighbour: String,
        order: i64,
        neighbour_order: i64,
    },
    /// Already first (up) or last (down); nothing written
    AtEdge,
}

/// Move the row `id` of `table` one place in `direction`
///
/// Siblings are the rows sharing the same parent column (all rows for
/// sections).
///
/// # Errors
/// - [`ReorderError::Store`] if reading fails or nothing was written
/// - [`ReorderError::NotInList`] if the row is not ordered or vanished
/// - [`ReorderError::PartiallyApplied`] if only the neighbour was updated
pub async fn move_entity(
    store: &dyn RemoteStore,
    table: Table,
    id: &str,
    direction: Direction,
) -> Result<MoveOutcome, ReorderError> {
    let Some(column) = table.order_column() else {
        return Err(StoreError::constraint(table, "table has no order column").into());
    };
    let row = store.get(table, id).await?;

    let mut filter = Filter::all();
    if let Some((parent_column, _)) = table.parent_column() {
        filter = filter.eq(parent_column, row.get(parent_column).cloned().unwrap_or(Value::Null));
    }
    let mut siblings = store.list(table, &filter).await?;
    sort_rows(&mut siblings, column);

    let Some(index) = siblings.iter().position(|r| r.get("id").and_then(Value::as_str) == Some(id)) else {
        return Err(ReorderError::NotInList {
            table,
            id: id.to_string(),
        });
    };
    let neighbour_index = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|i| *i < siblings.len()),
    };
    let Some(neighbour_index) = neighbour_index else {
        tracing::debug!(%table, id, ?direction, "already at edge");
        return Ok(MoveOutcome::AtEdge);
    };

    let neighbour = &siblings[neighbour_index];
    let neighbour_id = neighbour
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let current = order_of(&siblings[index], column);
    let other = order_of(neighbour, column);

    // Equal values cannot be swapped; step past the neighbour instead.
    let order = match (current == other, direction) {
        (false, _) => other,
        (true, Direction::Up) => other - 1,
        (true, Direction::Down) => other + 1,
    };
    let neighbour_order = current;

    let neighbour_write = (neighbour_id.clone(), order_row(column, neighbour_order));
    let moved_write = (id.to_string(), order_row(column, order));

    if store.supports_batch() {
        store
            .update_many(table, vec![neighbour_write, moved_write])
            .await?;
    } else {
        store
            .update(table, &neighbour_write.0, neighbour_write.1)
            .await?;
        if let Err(source) = store.update(table, &moved_write.0, moved_write.1).await {
            tracing::warn!(%table, moved = id, neighbour = %neighbour_id, error = %source, "reorder partially applied");
            return Err(ReorderError::PartiallyApplied {
                written: neighbour_id,
                failed: id.to_string(),
                source,
            });
        }
    }

    tracing::info!(%table, id, ?direction, order, neighbour = %neighbour_id, "entity moved");
    Ok(MoveOutcome::Moved {
        neighbour: neighbour_id,
        order,
        neighbour_order,
    })
}

/// Sort rows by `(column, id)`
pub fn sort_rows(rows: &mut [Row], column: &str) {
    rows.sort_by(|a, b| {
        let key = |r: &Row| r.get(column).cloned().unwrap_or(Value::Null);
        match compare_values(&key(a), &key(b)) {
            Ordering::Equal => compare_values(
                a.get("id").unwrap_or(&Value::Null),
                b.get("id").unwrap_or(&Value::Null),
            ),
            other => other,
        }
    });
}

fn order_of(row: &Row, column: &str) -> i64 {
    row.get(column)
        .and_then(crate::entity::coerce_int)
        .unwrap_or_default()
}

fn order_row(column: &str, value: i64) -> Row {
    let mut row = Row::new();
    row.insert(column.to_string(), Value::from(value));
    row
}
