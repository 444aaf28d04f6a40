//! Query cache using moka
//!
//! Caches list and detail query results per table. Invalidation is by
//! generation: every table has a counter in a [`DashMap`], the counter is
//! part of every cache key, and a mutation bumps the counter of its table
//! and of every table whose views embed it. Entries under an old generation
//! are never read again and age out of the cache.

use crate::error::StoreResult;
use crate::filter::Filter;
use crate::remote::RemoteStore;
use crate::table::Table;
use crate::Row;
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that went to the store
    pub misses: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    table: Table,
    generation: u64,
    query: String,
}

/// Generation-invalidated query result cache
#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Cache<QueryKey, Arc<Vec<Row>>>,
    generations: Arc<DashMap<Table, u64>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl QueryCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self::from_cache(Cache::new(max_capacity))
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self::from_cache(
            Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        )
    }

    fn from_cache(inner: Cache<QueryKey, Arc<Vec<Row>>>) -> Self {
        Self {
            inner,
            generations: Arc::new(DashMap::new()),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current generation of a table
    #[must_use]
    pub fn generation(&self, table: Table) -> u64 {
        self.generations.get(&table).map_or(0, |g| *g)
    }

    /// Get cached rows or fetch them
    ///
    /// The generation is read before fetching, so a result fetched while a
    /// mutation invalidated the table is stored under the stale generation
    /// and never served.
    ///
    /// # Errors
    /// Returns the fetch error; nothing is cached in that case.
    pub async fn try_get_or_fetch<E, F, Fut>(
        &self,
        table: Table,
        query: &str,
        fetch: F,
    ) -> Result<Arc<Vec<Row>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Row>, E>>,
    {
        let key = QueryKey {
            table,
            generation: self.generation(table),
            query: query.to_string(),
        };
        if let Some(rows) = self.inner.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(rows);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let rows = Arc::new(fetch().await?);
        self.inner.insert(key, Arc::clone(&rows)).await;
        Ok(rows)
    }

    /// Invalidate a table and every table whose views embed it
    pub fn invalidate(&self, table: Table) {
        let mut pending = vec![table];
        let mut seen = Vec::new();
        while let Some(t) = pending.pop() {
            if seen.contains(&t) {
                continue;
            }
            seen.push(t);
            *self.generations.entry(t).or_insert(0) += 1;
            pending.extend_from_slice(t.dependents());
        }
        tracing::trace!(%table, invalidated = ?seen, "cache invalidated");
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        for table in Table::ALL {
            *self.generations.entry(table).or_insert(0) += 1;
        }
        self.inner.invalidate_all();
    }

    /// Hit and miss counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueryCache {
    /// Create cache with default capacity (1,000 queries)
    fn default() -> Self {
        Self::new(1_000)
    }
}

/// Store decorator serving reads from a [`QueryCache`]
///
/// Successful mutations invalidate the affected table before returning;
/// failed ones leave the cache alone.
#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    cache: QueryCache,
}

impl<S: RemoteStore> CachedStore<S> {
    /// Wrap a store
    #[must_use]
    pub fn new(inner: S, cache: QueryCache) -> Self {
        Self { inner, cache }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Cache in front of the store
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for CachedStore<S> {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        let query = format!("list?{filter}");
        let rows = self
            .cache
            .try_get_or_fetch(table, &query, || self.inner.list(table, filter))
            .await?;
        Ok(rows.as_ref().clone())
    }

    async fn get(&self, table: Table, id: &str) -> StoreResult<Row> {
        let query = format!("get?id={id}");
        let rows = self
            .cache
            .try_get_or_fetch(table, &query, || async {
                self.inner.get(table, id).await.map(|row| vec![row])
            })
            .await?;
        rows.first()
            .cloned()
            .ok_or_else(|| crate::StoreError::not_found(table, id))
    }

    async fn create(&self, table: Table, fields: Row) -> StoreResult<Row> {
        let row = self.inner.create(table, fields).await?;
        self.cache.invalidate(table);
        Ok(row)
    }

    async fn update(&self, table: Table, id: &str, partial: Row) -> StoreResult<Row> {
        let row = self.inner.update(table, id, partial).await?;
        self.cache.invalidate(table);
        Ok(row)
    }

    async fn delete(&self, table: Table, id: &str) -> StoreResult<()> {
        self.inner.delete(table, id).await?;
        self.cache.invalidate(table);
        Ok(())
    }

    fn supports_batch(&self) -> bool {
        self.inner.supports_batch()
    }

    async fn update_many(&self, table: Table, updates: Vec<(String, Row)>) -> StoreResult<Vec<Row>> {
        let result = self.inner.update_many(table, updates).await;
        // A sequential fallback may have written some rows before failing.
        if result.is_ok() || !self.inner.supports_batch() {
            self.cache.invalidate(table);
        }
        result
    }
}
