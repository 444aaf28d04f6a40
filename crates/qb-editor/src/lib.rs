//! Questboard nested document editor
//!
//! Edits a stored document through a copy-on-write working copy and writes
//! it back explicitly or after a quiet period.
//!
//! # Core Concepts
//!
//! - [`EditBuffer`]: committed document, working copy and pending map-key
//!   renames; synchronous and store-agnostic
//! - [`EditSession`]: one buffer bound to one stored row, with commit,
//!   cancel, refresh and the debounced commit timer
//! - [`Debouncer`]: single restartable timer
//!
//! # Example
//!
//! ```rust,ignore
//! use qb_editor::{EditSession, EditorConfig};
//!
//! let session = EditSession::open_level(store, "level-1", EditorConfig::default()).await?;
//! let key = session.add_breakdown_item()?;
//! session.begin_key_rename(&MapField::Breakdown.path(), &key, "design")?;
//! session.commit_key_rename(&MapField::Breakdown.path(), &key)?;
//! // committed by the debounce timer three seconds later
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod buffer;
mod debounce;
mod error;
mod level;
mod session;

pub use buffer::{EditBuffer, PendingKey, RenameOutcome};
pub use debounce::{Debouncer, DEFAULT_QUIET_PERIOD};
pub use error::{EditorError, FieldError, ValidationErrors};
pub use session::{CommitOutcome, CommitStatus, EditSession, EditorConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
