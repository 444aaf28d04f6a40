//! Sections, paths and levels
//!
//! Read side returns sibling lists sorted by `(order, id)`. Write side is
//! driven by [`EditIntent`]s coming from the presentation layer; every
//! intent needs an admin [`UiSession`].

use crate::auth::UiSession;
use crate::error::{CoreError, CoreResult};
use qb_document::decode_level;
use qb_store::{
    coerce_int, move_entity, sort_siblings, Direction, Filter, LearningPath, Level, MoveOutcome, RemoteStore,
    Repository, Row, Section, Table, UserProgress,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Gradient applied to new sections
pub const DEFAULT_SECTION_COLOR: &str = "from-purple-500 to-pink-500";
/// Icon applied to new sections
pub const DEFAULT_SECTION_ICON: &str = "Code";

/// Section with the number of paths it holds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    #[serde(flatten)]
    pub section: Section,
    pub path_count: usize,
}

/// Action requested by a presentation component
#[derive(Debug, Clone, PartialEq)]
pub enum EditIntent {
    /// Persist changed fields of a row
    Save { table: Table, id: String, fields: Row },
    /// Remove a row
    Delete { table: Table, id: String },
    /// Move a row among its siblings
    Move {
        table: Table,
        id: String,
        direction: Direction,
    },
    /// Copy a level to the end of its path
    Duplicate { id: String },
}

/// What an intent did
#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    Saved(Row),
    Deleted,
    Moved(MoveOutcome),
    Duplicated(Level),
}

/// Content hierarchy access
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn RemoteStore>,
    sections: Repository<Section>,
    paths: Repository<LearningPath>,
    levels: Repository<Level>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    /// Create catalog over a store
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            sections: Repository::new(Arc::clone(&store)),
            paths: Repository::new(Arc::clone(&store)),
            levels: Repository::new(Arc::clone(&store)),
            store,
        }
    }

    /// All sections with their path counts
    ///
    /// # Errors
    /// [`CoreError::Store`] if either table cannot be read.
    pub async fn sections(&self) -> CoreResult<Vec<SectionSummary>> {
        let mut sections = self.sections.list(&Filter::all().order_by("order")).await?;
        sort_siblings(&mut sections);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for path in self.paths.list(&Filter::all()).await? {
            *counts.entry(path.section_id).or_default() += 1;
        }
        Ok(sections
            .into_iter()
            .map(|section| SectionSummary {
                path_count: counts.get(&section.id).copied().unwrap_or(0),
                section,
            })
            .collect())
    }

    /// One section
    ///
    /// # Errors
    /// [`CoreError::Store`] if the section does not exist.
    pub async fn section(&self, id: &str) -> CoreResult<Section> {
        Ok(self.sections.get(id).await?)
    }

    /// Paths of a section
    ///
    /// # Errors
    /// [`CoreError::Store`] if the table cannot be read.
    pub async fn paths(&self, section_id: &str) -> CoreResult<Vec<LearningPath>> {
        let filter = Filter::all().eq("section_id", section_id).order_by("order");
        let mut paths = self.paths.list(&filter).await?;
        sort_siblings(&mut paths);
        Ok(paths)
    }

    /// One path
    ///
    /// # Errors
    /// [`CoreError::Store`] if the path does not exist.
    pub async fn path(&self, id: &str) -> CoreResult<LearningPath> {
        Ok(self.paths.get(id).await?)
    }

    /// Levels of a path, by rank
    ///
    /// # Errors
    /// [`CoreError::Store`] if the table cannot be read.
    pub async fn levels(&self, path_id: &str) -> CoreResult<Vec<Level>> {
        let filter = Filter::all().eq("path_id", path_id).order_by("rank");
        let mut levels = self.levels.list(&filter).await?;
        sort_siblings(&mut levels);
        Ok(levels)
    }

    /// One level
    ///
    /// # Errors
    /// [`CoreError::Store`] if the level does not exist.
    pub async fn level(&self, id: &str) -> CoreResult<Level> {
        Ok(self.levels.get(id).await?)
    }

    /// Add a placeholder section at the end
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] or [`CoreError::Store`].
    pub async fn create_section(&self, session: UiSession) -> CoreResult<Section> {
        session.require_admin()?;
        let count = self.store.list(Table::Sections, &Filter::all()).await?.len();
        let section = self
            .sections
            .create(row(json!({
                "title": "New Section",
                "description": "Enter section description",
                "icon": DEFAULT_SECTION_ICON,
                "color": DEFAULT_SECTION_COLOR,
                "order": count,
            })))
            .await?;
        tracing::info!(id = %section.id, "section created");
        Ok(section)
    }

    /// Add a placeholder path at the end of a section
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] or [`CoreError::Store`] (e.g. unknown section).
    pub async fn create_path(&self, session: UiSession, section_id: &str) -> CoreResult<LearningPath> {
        session.require_admin()?;
        let count = self
            .store
            .list(Table::Paths, &Filter::all().eq("section_id", section_id))
            .await?
            .len();
        let path = self
            .paths
            .create(row(json!({
                "section_id": section_id,
                "title": "New Path",
                "description": "Enter path description",
                "hours": 0,
                "order": count,
            })))
            .await?;
        tracing::info!(id = %path.id, section_id, "path created");
        Ok(path)
    }

    /// Add a placeholder level at the end of a path
    ///
    /// All nested blocks start from their defaults.
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] or [`CoreError::Store`] (e.g. unknown path).
    pub async fn create_level(&self, session: UiSession, path_id: &str) -> CoreResult<Level> {
        session.require_admin()?;
        let rank = self.sibling_levels(path_id).await?;
        let mut fields = row(decode_level(&Value::Null).to_json());
        fields.insert("title".into(), json!("New Level"));
        fields.insert("description".into(), json!("Enter level description"));
        fields.insert("path_id".into(), json!(path_id));
        fields.insert("rank".into(), json!(rank));
        let level = self.levels.create(fields).await?;
        tracing::info!(id = %level.id, path_id, "level created");
        Ok(level)
    }

    /// Copy a level's editable content to the end of its path
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] or [`CoreError::Store`].
    pub async fn duplicate_level(&self, session: UiSession, id: &str) -> CoreResult<Level> {
        session.require_admin()?;
        let source = self.store.get(Table::Levels, id).await?;
        let path_id = source
            .get("path_id")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::required("path_id"))?
            .to_string();
        let mut fields = row(decode_level(&Value::Object(source)).to_json());
        let title = fields.get("title").and_then(Value::as_str).unwrap_or_default();
        let title = format!("{title} (copy)");
        fields.insert("title".into(), Value::String(title));
        fields.insert("rank".into(), json!(self.sibling_levels(&path_id).await?));
        fields.insert("path_id".into(), Value::String(path_id));
        let copy = self.levels.create(fields).await?;
        tracing::info!(source = id, id = %copy.id, "level duplicated");
        Ok(copy)
    }

    /// Persist changed fields
    ///
    /// Titles must not be blank; path hours are stored as integers.
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`], [`CoreError::Invalid`] before any store call,
    /// or [`CoreError::Store`].
    pub async fn save(&self, session: UiSession, table: Table, id: &str, mut fields: Row) -> CoreResult<Row> {
        session.require_admin()?;
        fields.remove("id");
        if matches!(table, Table::Sections | Table::Paths | Table::Levels) {
            if let Some(title) = fields.get("title") {
                if title.as_str().map_or(true, |t| t.trim().is_empty()) {
                    return Err(CoreError::required("title"));
                }
            }
        }
        if table == Table::Paths {
            if let Some(hours) = fields.get_mut("hours") {
                *hours = json!(coerce_int(hours).unwrap_or(0));
            }
        }
        let saved = self.store.update(table, id, fields).await?;
        tracing::info!(%table, id, "row saved");
        Ok(saved)
    }

    /// Delete a row and everything below it
    ///
    /// A section takes its paths with it, a path its levels, and a level the
    /// completions recorded against it. Children go first, so a failure
    /// part way leaves the parent in place.
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] or [`CoreError::Store`].
    pub async fn delete(&self, session: UiSession, table: Table, id: &str) -> CoreResult<()> {
        session.require_admin()?;
        match table {
            Table::Sections => self.delete_section(id).await?,
            Table::Paths => self.delete_path(id).await?,
            Table::Levels => self.delete_level(id).await?,
            _ => self.store.delete(table, id).await?,
        }
        tracing::info!(%table, id, "row deleted");
        Ok(())
    }

    async fn delete_section(&self, id: &str) -> CoreResult<()> {
        for path in self.paths.list(&Filter::all().eq("section_id", id)).await? {
            self.delete_path(&path.id).await?;
        }
        Ok(self.sections.delete(id).await?)
    }

    async fn delete_path(&self, id: &str) -> CoreResult<()> {
        for level in self.levels.list(&Filter::all().eq("path_id", id)).await? {
            self.delete_level(&level.id).await?;
        }
        Ok(self.paths.delete(id).await?)
    }

    async fn delete_level(&self, id: &str) -> CoreResult<()> {
        let progress = Repository::<UserProgress>::new(Arc::clone(&self.store));
        let done = progress.list(&Filter::all().eq("level_id", id)).await?;
        if !done.is_empty() {
            tracing::debug!(level_id = id, completions = done.len(), "dropping completions of deleted level");
        }
        for p in done {
            progress.delete(&p.id).await?;
        }
        Ok(self.levels.delete(id).await?)
    }

    /// Move a row one place among its siblings
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] or [`CoreError::Reorder`].
    pub async fn move_item(
        &self,
        session: UiSession,
        table: Table,
        id: &str,
        direction: Direction,
    ) -> CoreResult<MoveOutcome> {
        session.require_admin()?;
        Ok(move_entity(self.store.as_ref(), table, id, direction).await?)
    }

    /// Carry out a presentation intent
    ///
    /// # Errors
    /// Whatever the matching operation returns.
    pub async fn dispatch(&self, session: UiSession, intent: EditIntent) -> CoreResult<IntentOutcome> {
        tracing::debug!(?intent, "dispatching intent");
        match intent {
            EditIntent::Save { table, id, fields } => {
                self.save(session, table, &id, fields).await.map(IntentOutcome::Saved)
            }
            EditIntent::Delete { table, id } => {
                self.delete(session, table, &id).await.map(|()| IntentOutcome::Deleted)
            }
            EditIntent::Move { table, id, direction } => self
                .move_item(session, table, &id, direction)
                .await
                .map(IntentOutcome::Moved),
            EditIntent::Duplicate { id } => self
                .duplicate_level(session, &id)
                .await
                .map(IntentOutcome::Duplicated),
        }
    }

    async fn sibling_levels(&self, path_id: &str) -> CoreResult<usize> {
        Ok(self
            .store
            .list(Table::Levels, &Filter::all().eq("path_id", path_id))
            .await?
            .len())
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qb_test_utils::sample_store;

    fn catalog() -> Catalog {
        Catalog::new(sample_store())
    }

    const ADMIN: UiSession = UiSession::Admin;

    #[tokio::test]
    async fn sections_carry_path_counts() {
        let sections = catalog().sections().await.unwrap();
        let counts: Vec<_> = sections
            .iter()
            .map(|s| (s.section.id.as_str(), s.path_count))
            .collect();
        assert_eq!(counts, vec![("s-dev", 2), ("s-ops", 1)]);
    }

    #[tokio::test]
    async fn new_section_goes_last_with_defaults() {
        let c = catalog();
        let s = c.create_section(ADMIN).await.unwrap();
        assert_eq!(s.title, "New Section");
        assert_eq!(s.description, "Enter section description");
        assert_eq!(s.icon, "Code");
        assert_eq!(s.color, DEFAULT_SECTION_COLOR);
        assert_eq!(s.order, 2);
        assert_eq!(c.sections().await.unwrap().last().unwrap().section.id, s.id);
    }

    #[tokio::test]
    async fn new_path_and_level_defaults() {
        let c = catalog();
        let p = c.create_path(ADMIN, "s-ops").await.unwrap();
        assert_eq!((p.title.as_str(), p.hours, p.order), ("New Path", 0, 1));

        let l = c.create_level(ADMIN, &p.id).await.unwrap();
        assert_eq!(l.title, "New Level");
        assert_eq!(l.description, "Enter level description");
        assert_eq!(l.rank, 0);
        assert_eq!(l.details["process"], json!([]));
        assert_eq!(l.details["time_investment"], json!({"breakdown": {}, "totals": {}}));
    }

    #[tokio::test]
    async fn viewer_cannot_create() {
        let err = catalog().create_section(UiSession::Viewer).await.unwrap_err();
        assert!(matches!(err, CoreError::NotAdmin));
    }

    #[tokio::test]
    async fn duplicate_appends_copy() {
        let c = catalog();
        let copy = c.duplicate_level(ADMIN, "l-2").await.unwrap();
        assert_eq!(copy.title, "Traits (copy)");
        assert_eq!(copy.path_id, "p-rust");
        assert_eq!(copy.rank, 3);
        let original = c.level("l-2").await.unwrap();
        assert_eq!(copy.details["time_investment"], original.details["time_investment"]);
        let ids: Vec<_> = c.levels("p-rust").await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids.last(), Some(&copy.id));
    }

    #[tokio::test]
    async fn save_coerces_hours_and_checks_title() {
        let c = catalog();
        let saved = c
            .save(ADMIN, Table::Paths, "p-web", row(json!({"hours": "12.6"})))
            .await
            .unwrap();
        assert_eq!(saved["hours"], json!(13));
        let saved = c
            .save(ADMIN, Table::Paths, "p-web", row(json!({"hours": "lots"})))
            .await
            .unwrap();
        assert_eq!(saved["hours"], json!(0));

        let err = c
            .save(ADMIN, Table::Sections, "s-dev", row(json!({"title": "  "})))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(c.section("s-dev").await.unwrap().title, "Development");
    }

    #[tokio::test]
    async fn dispatch_move_swaps_with_neighbour() {
        let c = catalog();
        let outcome = c
            .dispatch(
                ADMIN,
                EditIntent::Move { table: Table::Levels, id: "l-3".into(), direction: Direction::Up },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, IntentOutcome::Moved(MoveOutcome::Moved { .. })));
        let ids: Vec<_> = c.levels("p-rust").await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["l-1", "l-3", "l-2"]);

        let edge = c
            .dispatch(
                ADMIN,
                EditIntent::Move { table: Table::Levels, id: "l-1".into(), direction: Direction::Up },
            )
            .await
            .unwrap();
        assert_eq!(edge, IntentOutcome::Moved(MoveOutcome::AtEdge));
    }

    #[tokio::test]
    async fn deleting_a_section_cascades_to_completions() {
        let store: Arc<dyn RemoteStore> = qb_test_utils::sample_store();
        let c = Catalog::new(Arc::clone(&store));
        c.delete(ADMIN, Table::Sections, "s-dev").await.unwrap();

        assert!(c.section("s-dev").await.unwrap_err().is_not_found());
        assert!(c.paths("s-dev").await.unwrap().is_empty());
        assert!(c.levels("p-rust").await.unwrap().is_empty());
        let left: Vec<_> = store
            .list(Table::UserProgress, &Filter::all())
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| r.get("level_id").and_then(Value::as_str).map(str::to_string))
            .collect();
        assert_eq!(left, vec!["l-4"]);
        assert_eq!(c.sections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_level_drops_its_completions_only() {
        let store: Arc<dyn RemoteStore> = qb_test_utils::sample_store();
        let c = Catalog::new(Arc::clone(&store));
        c.delete(ADMIN, Table::Levels, "l-1").await.unwrap();
        let levels: Vec<_> = c.levels("p-rust").await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(levels, vec!["l-2", "l-3"]);
        assert_eq!(store.list(Table::UserProgress, &Filter::all()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dispatch_delete_then_missing() {
        let c = catalog();
        let intent = EditIntent::Delete { table: Table::Paths, id: "p-web".into() };
        assert_eq!(c.dispatch(ADMIN, intent.clone()).await.unwrap(), IntentOutcome::Deleted);
        let err = c.dispatch(ADMIN, intent).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
