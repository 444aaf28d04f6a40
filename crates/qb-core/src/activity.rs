//! Activity feed

use crate::error::CoreResult;
use chrono::{DateTime, Utc};
use qb_store::{Activity, ActivityKind, Filter, Profile, RemoteStore, Repository, Row, Table};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Feed entry with the actor's name resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub kind: ActivityKind,
    pub description: String,
    pub profile_id: String,
    /// `None` when the profile has been deleted
    pub profile_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Most recent `limit` entries, newest first
///
/// # Errors
/// [`CoreError::Store`](crate::CoreError::Store) if a table cannot be read.
pub async fn recent_activity(store: &Arc<dyn RemoteStore>, limit: usize) -> CoreResult<Vec<FeedEntry>> {
    let filter = Filter::all().order_by_desc("created_at").limit(limit);
    let mut entries = Repository::<Activity>::new(Arc::clone(store)).list(&filter).await?;
    // Timestamps may be stored with differing offsets; order on the parsed value.
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    entries.truncate(limit);

    let names: HashMap<String, String> = Repository::<Profile>::new(Arc::clone(store))
        .list(&Filter::all())
        .await?
        .into_iter()
        .map(|p| (p.id, p.full_name))
        .collect();
    Ok(entries
        .into_iter()
        .map(|a| FeedEntry {
            kind: a.kind,
            profile_name: names.get(&a.profile_id).cloned(),
            profile_id: a.profile_id,
            description: a.description,
            created_at: a.created_at,
        })
        .collect())
}

/// Append an entry stamped now
///
/// # Errors
/// [`StoreError`](qb_store::StoreError) if the write is refused.
pub async fn log_activity(
    store: &dyn RemoteStore,
    profile_id: &str,
    kind: ActivityKind,
    description: &str,
) -> qb_store::StoreResult<Row> {
    let mut row = Row::new();
    row.insert("profile_id".into(), json!(profile_id));
    row.insert("type".into(), serde_json::to_value(kind)?);
    row.insert("description".into(), json!(description));
    row.insert("created_at".into(), json!(Utc::now()));
    store.create(Table::ActivityLog, row).await
}
