//! Typed repositories over a [`RemoteStore`]

use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::remote::RemoteStore;
use crate::Row;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// CRUD for one entity type
pub struct Repository<E> {
    store: Arc<dyn RemoteStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<E>())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Repository<E> {
    /// Create repository on a shared store
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Rows matching `filter`
    ///
    /// # Errors
    /// Store failures, or a row that does not decode.
    pub async fn list(&self, filter: &Filter) -> StoreResult<Vec<E>> {
        self.store
            .list(E::TABLE, filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Row by id
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if missing.
    pub async fn get(&self, id: &str) -> StoreResult<E> {
        decode(self.store.get(E::TABLE, id).await?)
    }

    /// Insert and return the stored entity
    ///
    /// # Errors
    /// Store failures, or a stored row that does not decode.
    pub async fn create(&self, fields: Row) -> StoreResult<E> {
        decode(self.store.create(E::TABLE, fields).await?)
    }

    /// Merge `partial` into the row and return the result
    ///
    /// # Errors
    /// Store failures, or a stored row that does not decode.
    pub async fn update(&self, id: &str, partial: Row) -> StoreResult<E> {
        decode(self.store.update(E::TABLE, id, partial).await?)
    }

    /// Delete by id
    ///
    /// # Errors
    /// Store failures.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(E::TABLE, id).await
    }
}

fn decode<E: Entity>(row: Row) -> StoreResult<E> {
    serde_json::from_value(Value::Object(row)).map_err(StoreError::from)
}

/// Encode an entity as a row
///
/// # Errors
/// [`StoreError::Serialization`] if the entity does not serialize to an
/// object.
pub fn to_row<E: Entity>(entity: &E) -> StoreResult<Row> {
    match serde_json::to_value(entity)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Serialization(serde::de::Error::custom(format!(
            "{} did not serialize to an object: {other}",
            E::TABLE
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{LearningPath, Section};
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn repo<E: Entity>() -> Repository<E> {
        let store = MemoryStore::from_snapshot(&json!({
            "sections": [{"id": "s1", "title": "Dev", "order": 1}, {"id": "s2", "title": "Ops", "order": 0}]
        }))
        .unwrap();
        Repository::new(Arc::new(store))
    }

    #[tokio::test]
    async fn list_decodes_rows() {
        let sections: Repository<Section> = repo();
        let listed = sections.list(&Filter::all().order_by("order")).await.unwrap();
        assert_eq!(listed.iter().map(|s| s.title.as_str()).collect::<Vec<_>>(), vec!["Ops", "Dev"]);
    }

    #[tokio::test]
    async fn create_through_shared_store() {
        let sections: Repository<Section> = repo();
        let paths: Repository<LearningPath> = Repository::new(Arc::clone(sections.store()));
        let mut fields = Row::new();
        fields.insert("section_id".into(), json!("s1"));
        fields.insert("title".into(), json!("Rust"));
        let created = paths.create(fields).await.unwrap();
        assert_eq!(created.section_id, "s1");
        assert_eq!(paths.get(&created.id).await.unwrap().title, "Rust");
    }

    #[tokio::test]
    async fn undecodable_row_is_serialization_error() {
        let store = MemoryStore::from_snapshot(&json!({"profiles": [{"id": "u1"}]})).unwrap();
        let profiles: Repository<crate::entity::Profile> = Repository::new(Arc::new(store));
        let err = profiles.get("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn to_row_encodes_entity() {
        let section = Section {
            id: "s".into(),
            title: "T".into(),
            description: String::new(),
            icon: "Code".into(),
            color: String::new(),
            order: 3,
        };
        let row = to_row(&section).unwrap();
        assert_eq!(row["order"], json!(3));
        assert_eq!(row["icon"], json!("Code"));
    }
}
