//! Questboard core
//!
//! The parts of the dashboard above the data layer:
//! - Admin gate and UI session mode
//! - Catalog of sections, paths and levels driven by edit intents
//! - User management with level completions
//! - Ranking board, per-user progress and activity feed
//! - Configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use qb_core::{Questboard, QuestboardConfig};
//! use qb_store::MemoryStore;
//!
//! let board = Questboard::new(MemoryStore::new(), QuestboardConfig::new().with_admin_secret("s3cret"))?;
//! board.gate().login("s3cret");
//! let section = board.catalog().create_section(board.gate().session()).await?;
//! let session = board.edit_level("level-1").await?;
//! session.add_breakdown_item()?;
//! session.commit().await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod activity;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
mod hierarchy;
pub mod progress;
mod questboard;
pub mod ranking;
pub mod users;

pub use activity::{log_activity, recent_activity, FeedEntry};
pub use auth::{AuthGate, UiSession};
pub use catalog::{Catalog, EditIntent, IntentOutcome, SectionSummary};
pub use config::{CacheConfig, QuestboardConfig};
pub use error::{CoreError, CoreResult};
pub use progress::{percent, user_progress, PathProgress, SectionProgress};
pub use questboard::Questboard;
pub use ranking::{rank_users, ranking, RankingEntry, Trophy};
pub use users::{Completion, LevelHit, ProfileInput, Users};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
