//! Testing utilities for questboard workspace
//!
//! Shared fixtures plus store wrappers that record or fail writes.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use qb_document::{decode_level, Document};
use qb_store::{Filter, MemoryStore, RemoteStore, Row, StoreError, StoreResult, Table};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Snapshot with two sections, three paths, four levels, three users
pub fn sample_snapshot() -> Value {
    json!({
        "sections": [
            {"id": "s-dev", "title": "Development", "description": "Build things", "icon": "Code", "color": "from-purple-500 to-pink-500", "order": 0},
            {"id": "s-ops", "title": "Operations", "description": "Run things", "icon": "Server", "color": "from-blue-500 to-cyan-500", "order": 1}
        ],
        "paths": [
            {"id": "p-rust", "section_id": "s-dev", "title": "Rust", "description": "Systems", "hours": 40, "order": 0},
            {"id": "p-web", "section_id": "s-dev", "title": "Web", "description": "Frontend", "hours": 20, "order": 1},
            {"id": "p-k8s", "section_id": "s-ops", "title": "Kubernetes", "description": "Clusters", "hours": 30, "order": 0}
        ],
        "levels": [
            level_row("l-1", "p-rust", "Ownership", 0),
            level_row("l-2", "p-rust", "Traits", 1),
            level_row("l-3", "p-rust", "Async", 2),
            level_row("l-4", "p-k8s", "Pods", 0)
        ],
        "profiles": [
            {"id": "u-ann", "full_name": "Ann Archer", "avatar_url": null},
            {"id": "u-bob", "full_name": "Bob Baker", "avatar_url": "https://example.com/bob.png"},
            {"id": "u-cat", "full_name": "Cat Cole", "avatar_url": null}
        ],
        "user_progress": [
            {"id": "up-1", "user_id": "u-ann", "level_id": "l-1", "completed_at": "2024-03-01T10:00:00Z"},
            {"id": "up-2", "user_id": "u-ann", "level_id": "l-2", "completed_at": "2024-03-05T10:00:00Z"},
            {"id": "up-3", "user_id": "u-ann", "level_id": "l-4", "completed_at": "2024-03-07T10:00:00Z"},
            {"id": "up-4", "user_id": "u-bob", "level_id": "l-1", "completed_at": "2024-03-02T10:00:00Z"}
        ],
        "activity_log": [
            {"id": "a-1", "profile_id": "u-ann", "type": "completion", "description": "Completed Ownership", "created_at": "2024-03-01T10:00:00Z"},
            {"id": "a-2", "profile_id": "u-bob", "type": "started", "description": "Started Rust", "created_at": "2024-03-02T09:00:00Z"},
            {"id": "a-3", "profile_id": "u-ann", "type": "achievement", "description": "First path", "created_at": "2024-03-05T11:00:00Z"}
        ]
    })
}

/// Level row with every nested block populated
pub fn level_row(id: &str, path_id: &str, title: &str, rank: i64) -> Value {
    json!({
        "id": id,
        "path_id": path_id,
        "title": title,
        "description": format!("{title} basics"),
        "description_extended": "",
        "info": "",
        "rank": rank,
        "process": ["Read the chapter", "Do the exercises", "Present"],
        "time_investment": {
            "breakdown": {"design": "2 hours", "build": "6 hours"},
            "totals": {"developer": {"total": "8 hours", "details": {"coding": "6 hours"}}}
        },
        "learning_materials": {
            "technieken": ["pairing"],
            "tools": [{"name": "rustup", "url": "https://rustup.rs"}],
            "courses": [],
            "youtube_channels": []
        },
        "assessment": {
            "main_task": "Build a CLI",
            "focus_points": ["error handling"],
            "presentation": {"duration": "15 min", "components": []}
        },
        "rewards_extended": {
            "recognition": "Badge",
            "skills": "Ownership",
            "toolkit": {"title": "Starter kit", "items": []},
            "gift": {"amount": "", "options": []},
            "certificate": {"title": "", "formats": []}
        }
    })
}

/// In-memory store loaded with [`sample_snapshot`]
pub fn sample_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_snapshot(&sample_snapshot()).expect("sample snapshot is well formed"))
}

/// Decoded editable document of a fixture level
pub fn level_document(id: &str, title: &str) -> Document {
    decode_level(&level_row(id, "p-rust", title, 0))
}

/// Convert a JSON object literal into a row
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// One update seen by a [`RecordingStore`]
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub table: Table,
    pub id: String,
    pub fields: Row,
    pub at: Instant,
}

/// Store wrapper recording every update with its (tokio) time
pub struct RecordingStore<S = MemoryStore> {
    inner: S,
    writes: Mutex<Vec<RecordedWrite>>,
    started: Instant,
    update_delay: Duration,
}

impl<S: RemoteStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            started: Instant::now(),
            update_delay: Duration::ZERO,
        }
    }

    /// Hold each update for `delay` before it reaches the inner store
    #[must_use]
    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay;
        self
    }

    /// Updates so far
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().clone()
    }

    /// Time of each update since the store was created, in milliseconds
    pub fn write_times_ms(&self) -> Vec<u128> {
        self.writes
            .lock()
            .iter()
            .map(|w| (w.at - self.started).as_millis())
            .collect()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for RecordingStore<S> {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        self.inner.list(table, filter).await
    }

    async fn get(&self, table: Table, id: &str) -> StoreResult<Row> {
        self.inner.get(table, id).await
    }

    async fn create(&self, table: Table, fields: Row) -> StoreResult<Row> {
        self.inner.create(table, fields).await
    }

    async fn update(&self, table: Table, id: &str, partial: Row) -> StoreResult<Row> {
        self.writes.lock().push(RecordedWrite {
            table,
            id: id.to_string(),
            fields: partial.clone(),
            at: Instant::now(),
        });
        if !self.update_delay.is_zero() {
            tokio::time::sleep(self.update_delay).await;
        }
        self.inner.update(table, id, partial).await
    }

    async fn delete(&self, table: Table, id: &str) -> StoreResult<()> {
        self.inner.delete(table, id).await
    }

    fn supports_batch(&self) -> bool {
        self.inner.supports_batch()
    }

    async fn update_many(&self, table: Table, updates: Vec<(String, Row)>) -> StoreResult<Vec<Row>> {
        let now = Instant::now();
        self.writes.lock().extend(updates.iter().map(|(id, fields)| RecordedWrite {
            table,
            id: id.clone(),
            fields: fields.clone(),
            at: now,
        }));
        self.inner.update_many(table, updates).await
    }
}

/// Store wrapper failing selected updates with a transport error
pub struct FailingStore<S = MemoryStore> {
    inner: S,
    fail_on: Vec<usize>,
    fail_all: std::sync::atomic::AtomicBool,
    seen: AtomicUsize,
}

impl<S: RemoteStore> FailingStore<S> {
    /// Fail the `n`-th update (1-based) and no other
    pub fn nth_update(inner: S, n: usize) -> Self {
        Self {
            inner,
            fail_on: vec![n],
            fail_all: false.into(),
            seen: AtomicUsize::new(0),
        }
    }

    /// Fail every update until [`set_failing(false)`](Self::set_failing)
    pub fn all_updates(inner: S) -> Self {
        Self {
            inner,
            fail_on: Vec::new(),
            fail_all: true.into(),
            seen: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    /// Number of update attempts, failed or not
    pub fn attempts(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for FailingStore<S> {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        self.inner.list(table, filter).await
    }

    async fn get(&self, table: Table, id: &str) -> StoreResult<Row> {
        self.inner.get(table, id).await
    }

    async fn create(&self, table: Table, fields: Row) -> StoreResult<Row> {
        self.inner.create(table, fields).await
    }

    async fn update(&self, table: Table, id: &str, partial: Row) -> StoreResult<Row> {
        let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_all.load(Ordering::SeqCst) || self.fail_on.contains(&n) {
            return Err(StoreError::Transport(format!("injected failure on update #{n}")));
        }
        self.inner.update(table, id, partial).await
    }

    async fn delete(&self, table: Table, id: &str) -> StoreResult<()> {
        self.inner.delete(table, id).await
    }
}
