//! User management
//!
//! Profiles, level completions, and level search for assigning
//! completions. Mutations need an admin session.

use crate::activity::log_activity;
use crate::auth::UiSession;
use crate::error::{CoreError, CoreResult};
use crate::hierarchy::Hierarchy;
use chrono::{DateTime, Utc};
use qb_store::{ActivityKind, Filter, Level, Profile, RemoteStore, Repository, Row, UserProgress};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Profile fields as entered in a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileInput {
    pub full_name: String,
    pub avatar_url: String,
}

impl ProfileInput {
    /// Create input
    pub fn new(full_name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// Trimmed row; a blank avatar is stored as null
    fn into_row(self) -> CoreResult<Row> {
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err(CoreError::required("full_name"));
        }
        let avatar = self.avatar_url.trim();
        let mut row = Row::new();
        row.insert("full_name".into(), json!(full_name));
        row.insert(
            "avatar_url".into(),
            if avatar.is_empty() { Value::Null } else { json!(avatar) },
        );
        Ok(row)
    }
}

/// Completed level with its place in the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub progress_id: String,
    pub level_id: String,
    pub level_title: String,
    pub path_title: String,
    pub section_title: String,
    pub completed_at: DateTime<Utc>,
}

/// Level search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelHit {
    pub level_id: String,
    pub level_title: String,
    pub path_title: String,
    pub section_title: String,
}

/// Profile and completion management
#[derive(Clone)]
pub struct Users {
    store: Arc<dyn RemoteStore>,
    profiles: Repository<Profile>,
    progress: Repository<UserProgress>,
}

impl std::fmt::Debug for Users {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Users").finish_non_exhaustive()
    }
}

impl Users {
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            profiles: Repository::new(Arc::clone(&store)),
            progress: Repository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Profiles whose name contains `search`, case-insensitively, by name
    ///
    /// # Errors
    /// [`CoreError::Store`] if the table cannot be read.
    pub async fn profiles(&self, search: Option<&str>) -> CoreResult<Vec<Profile>> {
        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        let mut profiles: Vec<Profile> = self
            .profiles
            .list(&Filter::all())
            .await?
            .into_iter()
            .filter(|p| p.full_name.to_lowercase().contains(&needle))
            .collect();
        profiles.sort_by(|a, b| {
            a.full_name
                .to_lowercase()
                .cmp(&b.full_name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(profiles)
    }

    /// One profile
    ///
    /// # Errors
    /// [`CoreError::Store`] if the profile does not exist.
    pub async fn profile(&self, id: &str) -> CoreResult<Profile> {
        Ok(self.profiles.get(id).await?)
    }

    /// # Errors
    /// [`CoreError::Invalid`] on a blank name, before any store call.
    pub async fn create_profile(&self, session: UiSession, input: ProfileInput) -> CoreResult<Profile> {
        session.require_admin()?;
        let profile = self.profiles.create(input.into_row()?).await?;
        tracing::info!(id = %profile.id, "profile created");
        Ok(profile)
    }

    /// # Errors
    /// [`CoreError::Invalid`] on a blank name, before any store call.
    pub async fn update_profile(&self, session: UiSession, id: &str, input: ProfileInput) -> CoreResult<Profile> {
        session.require_admin()?;
        let profile = self.profiles.update(id, input.into_row()?).await?;
        tracing::info!(id, "profile updated");
        Ok(profile)
    }

    /// Delete a profile together with its completions
    ///
    /// # Errors
    /// [`CoreError::Store`]; completions removed before the failure stay
    /// removed.
    pub async fn delete_profile(&self, session: UiSession, id: &str) -> CoreResult<()> {
        session.require_admin()?;
        for p in self.progress.list(&Filter::all().eq("user_id", id)).await? {
            self.progress.delete(&p.id).await?;
        }
        self.profiles.delete(id).await?;
        tracing::info!(id, "profile deleted");
        Ok(())
    }

    /// Mark a level completed now
    ///
    /// Also appends a completion entry to the activity log; a failure there
    /// is logged and does not undo the completion.
    ///
    /// # Errors
    /// [`CoreError::Store`] if the level is unknown or already completed.
    pub async fn record_completion(&self, session: UiSession, user_id: &str, level_id: &str) -> CoreResult<UserProgress> {
        session.require_admin()?;
        let level: Level = Repository::new(Arc::clone(&self.store)).get(level_id).await?;
        let mut row = Row::new();
        row.insert("user_id".into(), json!(user_id));
        row.insert("level_id".into(), json!(level_id));
        row.insert("completed_at".into(), json!(Utc::now()));
        let progress = self.progress.create(row).await?;
        tracing::info!(user_id, level_id, "level completion recorded");

        let description = format!("Completed {}", level.title);
        if let Err(e) = log_activity(self.store.as_ref(), user_id, ActivityKind::Completion, &description).await {
            tracing::warn!(user_id, error = %e, "activity entry not written");
        }
        Ok(progress)
    }

    /// # Errors
    /// [`CoreError::Store`] if the completion does not exist.
    pub async fn remove_completion(&self, session: UiSession, progress_id: &str) -> CoreResult<()> {
        session.require_admin()?;
        self.progress.delete(progress_id).await?;
        tracing::info!(progress_id, "level completion removed");
        Ok(())
    }

    /// A user's completions, newest first
    ///
    /// # Errors
    /// [`CoreError::Store`] if a table cannot be read.
    pub async fn completions(&self, user_id: &str) -> CoreResult<Vec<Completion>> {
        let filter = Filter::all().eq("user_id", user_id).order_by_desc("completed_at");
        let mut progress = self.progress.list(&filter).await?;
        progress.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then_with(|| a.id.cmp(&b.id)));
        let hierarchy = Hierarchy::load(&self.store).await?;
        Ok(progress
            .into_iter()
            .map(|p| {
                let (level_title, path_title, section_title) = hierarchy.titles(&p.level_id);
                Completion {
                    progress_id: p.id,
                    level_id: p.level_id,
                    level_title,
                    path_title,
                    section_title,
                    completed_at: p.completed_at,
                }
            })
            .collect())
    }

    /// Levels whose own, path or section title contains `query`
    ///
    /// Results follow the hierarchy: section order, path order, rank.
    ///
    /// # Errors
    /// [`CoreError::Store`] if a table cannot be read.
    pub async fn search_levels(&self, query: &str) -> CoreResult<Vec<LevelHit>> {
        let needle = query.trim().to_lowercase();
        let hierarchy = Hierarchy::load(&self.store).await?;
        let mut hits: Vec<((i64, i64, i64), LevelHit)> = hierarchy
            .levels
            .values()
            .filter_map(|level| {
                let (level_title, path_title, section_title) = hierarchy.titles(&level.id);
                let matches = [&level_title, &path_title, &section_title]
                    .iter()
                    .any(|t| t.to_lowercase().contains(&needle));
                matches.then(|| {
                    (
                        hierarchy.sort_key(level),
                        LevelHit {
                            level_id: level.id.clone(),
                            level_title,
                            path_title,
                            section_title,
                        },
                    )
                })
            })
            .collect();
        hits.sort_by(|(a, x), (b, y)| a.cmp(b).then_with(|| x.level_id.cmp(&y.level_id)));
        Ok(hits.into_iter().map(|(_, hit)| hit).collect())
    }
}
