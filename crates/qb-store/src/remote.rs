//! Remote store seam
//!
//! [`RemoteStore`] is the only way the rest of the system reaches persisted
//! data. Rows are untyped JSON objects; [`Repository`](crate::Repository)
//! layers typed entities on top.

use crate::error::StoreResult;
use crate::filter::Filter;
use crate::table::Table;
use crate::Row;
use async_trait::async_trait;

/// CRUD access to a hosted relational store
///
/// Implementations own consistency and authorization. Each call may fail
/// with a transport or store error; none are retried here.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Rows of `table` matching `filter`
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>>;

    /// Row by id
    async fn get(&self, table: Table, id: &str) -> StoreResult<Row>;

    /// Insert a row, returning it as stored (with generated columns)
    async fn create(&self, table: Table, fields: Row) -> StoreResult<Row>;

    /// Merge `partial` into an existing row, returning the result
    async fn update(&self, table: Table, id: &str, partial: Row) -> StoreResult<Row>;

    /// Delete a row
    async fn delete(&self, table: Table, id: &str) -> StoreResult<()>;

    /// Check if [`update_many`](Self::update_many) is all-or-nothing
    fn supports_batch(&self) -> bool {
        false
    }

    /// Apply several updates
    ///
    /// The default issues them one by one in order and stops at the first
    /// failure, so earlier writes stay applied. Stores that report
    /// [`supports_batch`](Self::supports_batch) apply all or none.
    async fn update_many(&self, table: Table, updates: Vec<(String, Row)>) -> StoreResult<Vec<Row>> {
        let mut out = Vec::with_capacity(updates.len());
        for (id, partial) in updates {
            out.push(self.update(table, &id, partial).await?);
        }
        Ok(out)
    }
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<S> {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        (**self).list(table, filter).await
    }

    async fn get(&self, table: Table, id: &str) -> StoreResult<Row> {
        (**self).get(table, id).await
    }

    async fn create(&self, table: Table, fields: Row) -> StoreResult<Row> {
        (**self).create(table, fields).await
    }

    async fn update(&self, table: Table, id: &str, partial: Row) -> StoreResult<Row> {
        (**self).update(table, id, partial).await
    }

    async fn delete(&self, table: Table, id: &str) -> StoreResult<()> {
        (**self).delete(table, id).await
    }

    fn supports_batch(&self) -> bool {
        (**self).supports_batch()
    }

    async fn update_many(&self, table: Table, updates: Vec<(String, Row)>) -> StoreResult<Vec<Row>> {
        (**self).update_many(table, updates).await
    }
}
