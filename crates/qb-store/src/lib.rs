//! Questboard data access layer
//!
//! Everything persisted lives behind [`RemoteStore`], an async CRUD seam over
//! JSON rows. On top of it:
//!
//! - [`CachedStore`] / [`QueryCache`]: moka-backed read cache, invalidated by
//!   successful mutations of a table and of tables whose views embed it
//! - [`Repository`]: typed CRUD per [`Entity`]
//! - [`move_entity`]: up/down reorder among siblings
//! - [`MemoryStore`]: in-process store with snapshot load/dump

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod entity;
mod error;
mod filter;
mod memory;
mod remote;
mod reorder;
mod repository;
mod table;

/// Untyped row as exchanged with the store
pub type Row = serde_json::Map<String, serde_json::Value>;

pub use cache::{CacheStats, CachedStore, QueryCache};
pub use entity::{
    coerce_int, sort_siblings, Activity, ActivityKind, Entity, LearningPath, Level, Ordered, Profile,
    Section, UserProgress,
};
pub use error::{ReorderError, StoreError, StoreResult};
pub use filter::{compare_values, Filter, OrderBy};
pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use reorder::{move_entity, sort_rows, Direction, MoveOutcome};
pub use repository::{to_row, Repository};
pub use table::Table;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
