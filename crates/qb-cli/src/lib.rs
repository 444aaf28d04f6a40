//! Questboard command-line tool
//!
//! `qb` loads every table from a JSON snapshot into memory, runs one
//! command through [`qb_core::Questboard`], and writes the snapshot back
//! when the command changed data.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod edits;
pub mod snapshot;

pub use cli::{Cli, Command, MoveDirection};
pub use commands::{run, Report};
pub use edits::LevelEdit;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
