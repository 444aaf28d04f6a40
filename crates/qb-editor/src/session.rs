//! Edit sessions
//!
//! An [`EditSession`] owns one [`EditBuffer`] for one stored row and is the
//! only thing that writes the buffer to the store.
//!
//! # Commit discipline
//!
//! - Edits under a debounced field restart a single quiet-period timer; when
//!   it fires, the buffer as of that moment is written.
//! - [`EditSession::commit`] cancels the timer and writes immediately.
//! - Writes go through an async gate and snapshot the buffer only after
//!   entering it, so at most one write is in flight and a write never
//!   carries older data than the one before it.
//! - A failed write leaves the buffer as it was; nothing is retried.

use crate::buffer::{EditBuffer, RenameOutcome};
use crate::debounce::{Debouncer, DEFAULT_QUIET_PERIOD};
use crate::error::{EditorError, FieldError, ValidationErrors};
use parking_lot::Mutex;
use qb_document::{DocPath, Document, EditOp, Node, RenameCollisionPolicy, TIME_INVESTMENT};
use qb_store::{RemoteStore, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Editor behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before a debounced commit
    #[serde(with = "millis")]
    pub debounce: Duration,
    /// Top-level fields whose edits schedule a debounced commit
    pub debounced_fields: Vec<String>,
    /// What a rename onto an existing key does
    pub rename_policy: RenameCollisionPolicy,
    /// Top-level text fields that must not be blank on commit
    pub required_fields: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_QUIET_PERIOD,
            debounced_fields: vec![TIME_INVESTMENT.to_string()],
            rename_policy: RenameCollisionPolicy::default(),
            required_fields: vec!["title".to_string()],
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Latest write outcome, observable by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommitStatus {
    /// Nothing written yet
    #[default]
    Idle,
    /// Store accepted the write with this sequence number
    Saved { revision: u64 },
    /// Last write failed; the buffer still holds the edits
    Failed { message: String },
}

/// What a commit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Buffer written to the store
    Sent,
    /// Buffer equal to the committed document; nothing written
    Clean,
}

struct Inner {
    table: Table,
    id: String,
    store: Arc<dyn RemoteStore>,
    config: EditorConfig,
    state: Mutex<EditBuffer>,
    /// Bumped by every cancel, under the state lock
    cancels: AtomicU64,
    write_gate: tokio::sync::Mutex<u64>,
    debouncer: Debouncer,
    status: watch::Sender<CommitStatus>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.debouncer.cancel();
    }
}

/// Editing session for one stored document
#[derive(Clone)]
pub struct EditSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("table", &self.inner.table)
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Open a session on an already fetched document
    #[must_use]
    pub fn new(
        store: Arc<dyn RemoteStore>,
        table: Table,
        id: impl Into<String>,
        document: Document,
        config: EditorConfig,
    ) -> Self {
        let (status, _) = watch::channel(CommitStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                table,
                id: id.into(),
                store,
                state: Mutex::new(EditBuffer::new(document, config.rename_policy)),
                cancels: AtomicU64::new(0),
                write_gate: tokio::sync::Mutex::new(0),
                debouncer: Debouncer::new(config.debounce),
                config,
                status,
            }),
        }
    }

    /// Fetch a row and open a session on it
    ///
    /// `decode` turns the row into the edited document, applying defaults.
    ///
    /// # Errors
    /// Returns [`EditorError::Store`] if the row cannot be fetched.
    pub async fn open(
        store: Arc<dyn RemoteStore>,
        table: Table,
        id: &str,
        decode: impl FnOnce(&Value) -> Document,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let row = store.get(table, id).await?;
        let document = decode(&Value::Object(row));
        tracing::debug!(%table, id, "edit session opened");
        Ok(Self::new(store, table, id, document, config))
    }

    /// Row id being edited
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Editor configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    /// Working copy
    #[must_use]
    pub fn buffer(&self) -> Document {
        self.inner.state.lock().buffer().clone()
    }

    /// Last committed document
    #[must_use]
    pub fn committed(&self) -> Document {
        self.inner.state.lock().committed().clone()
    }

    /// Check if there are uncommitted edits
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().is_dirty()
    }

    /// Check if a debounced commit is waiting
    #[must_use]
    pub fn has_pending_commit(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Watch write outcomes, including those of debounced commits
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CommitStatus> {
        self.inner.status.subscribe()
    }

    /// Run a buffer edit, then schedule a commit if `path` is debounced
    fn edit<T>(
        &self,
        path: &DocPath,
        f: impl FnOnce(&mut EditBuffer) -> Result<T, qb_document::EditError>,
    ) -> Result<T, EditorError> {
        let out = f(&mut self.inner.state.lock())?;
        if self.is_debounced(path) {
            self.schedule_debounced_commit();
        }
        Ok(out)
    }

    fn is_debounced(&self, path: &DocPath) -> bool {
        path.first().is_some_and(|first| {
            self.inner
                .config
                .debounced_fields
                .iter()
                .any(|f| f == first)
        })
    }

    /// Apply a raw operation
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the operation does not fit the buffer.
    pub fn apply(&self, op: &EditOp) -> Result<(), EditorError> {
        self.edit(op.target(), |b| b.apply(op))
    }

    /// Append `value` to the list at `path`
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `path` is not a list.
    pub fn add_list_item(&self, path: &DocPath, value: Node) -> Result<(), EditorError> {
        self.edit(path, |b| b.add_list_item(path, value))
    }

    /// Remove the item at `index`; out of range does nothing
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `path` is not a list.
    pub fn remove_list_item(&self, path: &DocPath, index: usize) -> Result<(), EditorError> {
        self.edit(path, |b| b.remove_list_item(path, index))
    }

    /// Replace the item at `index`
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `path` is not a list or `index` is out of range.
    pub fn update_list_item(&self, path: &DocPath, index: usize, value: Node) -> Result<(), EditorError> {
        self.edit(path, |b| b.update_list_item(path, index, value))
    }

    /// Add an entry under a generated key and return the key
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `path` is not a map.
    pub fn add_map_entry(&self, path: &DocPath, prefix: &str, value: Node) -> Result<String, EditorError> {
        self.edit(path, |b| b.add_map_entry(path, prefix, value))
    }

    /// Delete an entry and its pending rename
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the key does not exist.
    pub fn remove_map_entry(&self, path: &DocPath, key: &str) -> Result<(), EditorError> {
        self.edit(path, |b| b.remove_map_entry(path, key))
    }

    /// Replace the value under `key`
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the key does not exist.
    pub fn update_map_value(&self, path: &DocPath, key: &str, value: Node) -> Result<(), EditorError> {
        self.edit(path, |b| b.update_map_value(path, key, value))
    }

    /// Set a record field
    ///
    /// # Errors
    /// [`EditorError::Edit`] if `path` is not a record.
    pub fn set_field(&self, path: &DocPath, field: &str, value: Node) -> Result<(), EditorError> {
        let full = path.child(field);
        self.edit(&full, |b| b.set_field(path, field, value))
    }

    /// Record a proposed key while the input has focus
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the key does not exist.
    pub fn begin_key_rename(&self, path: &DocPath, old_key: &str, proposed: &str) -> Result<(), EditorError> {
        self.inner
            .state
            .lock()
            .begin_key_rename(path, old_key, proposed)
            .map_err(EditorError::from)
    }

    /// Key to display for an entry
    #[must_use]
    pub fn display_key(&self, path: &DocPath, old_key: &str) -> String {
        self.inner.state.lock().display_key(path, old_key).to_string()
    }

    /// Reconcile a rename on focus loss
    ///
    /// # Errors
    /// [`EditorError::Edit`] if the map or key vanished meanwhile.
    pub fn commit_key_rename(&self, path: &DocPath, old_key: &str) -> Result<RenameOutcome, EditorError> {
        let outcome = self.inner.state.lock().commit_key_rename(path, old_key)?;
        if matches!(outcome, RenameOutcome::Renamed { .. }) && self.is_debounced(path) {
            self.schedule_debounced_commit();
        }
        Ok(outcome)
    }

    /// Restart the quiet-period timer
    pub fn schedule_debounced_commit(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Reported through the status channel.
            let _ = write(&inner).await;
        });
        tracing::trace!(id = %self.inner.id, "debounced commit scheduled");
    }

    /// Write the buffer now, cancelling any pending debounced commit
    ///
    /// # Errors
    /// - [`EditorError::Validation`] if a required field is blank; nothing
    ///   is sent
    /// - [`EditorError::Store`] if the store fails; the buffer is unchanged
    ///   and the session stays open
    pub async fn commit(&self) -> Result<CommitOutcome, EditorError> {
        if self.inner.debouncer.cancel() {
            tracing::debug!(id = %self.inner.id, "pending debounced commit flushed");
        }
        write(&self.inner).await
    }

    /// Discard edits, renames and any pending debounced commit
    ///
    /// A write already in flight is not recalled. If it succeeds and
    /// nothing was edited since, the session settles on what it wrote.
    pub fn cancel(&self) {
        self.inner.debouncer.cancel();
        let mut state = self.inner.state.lock();
        self.inner.cancels.fetch_add(1, Ordering::SeqCst);
        state.cancel();
        drop(state);
        tracing::debug!(id = %self.inner.id, "edit session cancelled");
    }

    /// Take a fresh value fetched from the store
    ///
    /// The working copy follows only when there are no local edits and no
    /// commit is waiting. Returns whether it did.
    pub fn refresh(&self, fresh: Document) -> bool {
        let waiting = self.inner.debouncer.is_pending();
        let mut state = self.inner.state.lock();
        if waiting {
            state.mark_committed(fresh);
            return false;
        }
        state.refresh(fresh)
    }

    /// Check required fields of the working copy
    ///
    /// # Errors
    /// Lists every blank required field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate(&self.inner.config, &self.buffer())
    }
}

fn validate(config: &EditorConfig, doc: &Document) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for field in &config.required_fields {
        let path = DocPath::single(field.as_str());
        let blank = doc
            .get(&path)
            .and_then(|n| n.as_text())
            .map_or(true, |s| s.trim().is_empty());
        if blank {
            errors.push(FieldError::new(path, "is required"));
        }
    }
    errors.into_result()
}

async fn write(inner: &Inner) -> Result<CommitOutcome, EditorError> {
    let mut revision = inner.write_gate.lock().await;
    let (snapshot, clean, cancels) = {
        let state = inner.state.lock();
        (
            state.buffer().clone(),
            !state.is_dirty(),
            inner.cancels.load(Ordering::SeqCst),
        )
    };
    if clean {
        return Ok(CommitOutcome::Clean);
    }
    validate(&inner.config, &snapshot)?;

    let partial: Row = match snapshot.to_json() {
        Value::Object(fields) => fields,
        _ => Row::new(),
    };
    match inner.store.update(inner.table, &inner.id, partial).await {
        Ok(_) => {
            *revision += 1;
            {
                let mut state = inner.state.lock();
                let cancelled = inner.cancels.load(Ordering::SeqCst) != cancels;
                // Edits made after the cancel are kept.
                let untouched = state.is_idle();
                state.mark_committed(snapshot);
                if cancelled && untouched {
                    // The store now holds the sent value.
                    state.cancel();
                    tracing::debug!(id = %inner.id, "cancel during write settled on the written document");
                }
            }
            inner.status.send_replace(CommitStatus::Saved { revision: *revision });
            tracing::info!(table = %inner.table, id = %inner.id, revision = *revision, "document committed");
            Ok(CommitOutcome::Sent)
        }
        Err(e) => {
            tracing::error!(table = %inner.table, id = %inner.id, error = %e, "commit failed");
            inner.status.send_replace(CommitStatus::Failed {
                message: e.to_string(),
            });
            Err(e.into())
        }
    }
}
