//! Application facade wiring store, cache, gate and views together

use crate::activity::{recent_activity, FeedEntry};
use crate::auth::AuthGate;
use crate::catalog::Catalog;
use crate::config::QuestboardConfig;
use crate::error::CoreResult;
use crate::progress::{user_progress, SectionProgress};
use crate::ranking::{ranking, RankingEntry};
use crate::users::Users;
use qb_editor::EditSession;
use qb_store::{CacheStats, CachedStore, QueryCache, RemoteStore};
use std::sync::Arc;

/// Everything a presentation layer needs
pub struct Questboard {
    config: QuestboardConfig,
    store: Arc<dyn RemoteStore>,
    cache: QueryCache,
    gate: AuthGate,
    catalog: Catalog,
    users: Users,
}

impl std::fmt::Debug for Questboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Questboard")
            .field("config", &self.config)
            .field("session", &self.gate.session())
            .finish_non_exhaustive()
    }
}

impl Questboard {
    /// Wrap `store` in a query cache sized by `config`
    ///
    /// # Errors
    /// [`CoreError::Config`](crate::CoreError::Config) on invalid settings.
    pub fn new<S: RemoteStore + 'static>(store: S, config: QuestboardConfig) -> CoreResult<Self> {
        config.validate()?;
        let gate = AuthGate::from_config(&config)?;
        let cache = QueryCache::with_ttl(config.cache.capacity, config.cache.ttl());
        let store: Arc<dyn RemoteStore> = Arc::new(CachedStore::new(store, cache.clone()));
        tracing::debug!(
            capacity = config.cache.capacity,
            ttl_secs = config.cache.ttl_secs,
            "questboard ready"
        );
        Ok(Self {
            catalog: Catalog::new(Arc::clone(&store)),
            users: Users::new(Arc::clone(&store)),
            config,
            store,
            cache,
            gate,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &QuestboardConfig {
        &self.config
    }

    /// Cached store shared by every view
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    #[must_use]
    pub fn users(&self) -> &Users {
        &self.users
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// # Errors
    /// [`CoreError::Store`](crate::CoreError::Store) if a table cannot be read.
    pub async fn ranking(&self) -> CoreResult<Vec<RankingEntry>> {
        ranking(&self.store).await
    }

    /// # Errors
    /// [`CoreError::Store`](crate::CoreError::Store) if a table cannot be read.
    pub async fn progress(&self, user_id: &str) -> CoreResult<Vec<SectionProgress>> {
        user_progress(&self.store, user_id).await
    }

    /// Latest entries, as many as configured
    ///
    /// # Errors
    /// [`CoreError::Store`](crate::CoreError::Store) if a table cannot be read.
    pub async fn activity(&self) -> CoreResult<Vec<FeedEntry>> {
        recent_activity(&self.store, self.config.activity_limit).await
    }

    /// Open the nested editor on a level; admin only
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`](crate::CoreError::NotAdmin) or a store failure
    /// fetching the level.
    pub async fn edit_level(&self, id: &str) -> CoreResult<EditSession> {
        self.gate.session().require_admin()?;
        let session = EditSession::open_level(Arc::clone(&self.store), id, self.config.editor.clone()).await?;
        Ok(session)
    }
}
