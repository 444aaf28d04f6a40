//! Questboard document model
//!
//! Nested, semi-structured documents with copy-on-write edits.
//!
//! # Core Concepts
//!
//! - [`Node`]: tagged tree node (list, dynamic-key map, fixed record, scalars)
//! - [`Shape`]: per-field schema with explicit default construction
//! - [`Document`]: immutable root; [`Document::apply`] returns a new one
//! - [`EditOp`]: closed set of structural edits
//! - [`DocPath`]: hierarchical addressing within a document
//!
//! # Example
//!
//! ```rust,ignore
//! use qb_document::{decode_level, EditOp, ListField};
//!
//! let doc = decode_level(&row);
//! let next = doc.apply(&EditOp::AddListItem {
//!     path: ListField::FocusPoints.path(),
//!     value: ListField::FocusPoints.default_item(),
//! })?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod keys;
mod level;
mod node;
mod ops;
mod path;
mod shape;

pub use document::Document;
pub use keys::generate_key;
pub use level::{decode_level, level_shape, ListField, MapField, EDITABLE_FIELDS, TIME_INVESTMENT};
pub use node::{Entries, Node, NodeKind, NodeRef};
pub use ops::{EditError, EditOp, RenameCollisionPolicy};
pub use path::{DocPath, PathError};
pub use shape::{Field, Shape, DEFAULT_DURATION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
