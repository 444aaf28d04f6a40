//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use qb_store::{Direction, Table};
use std::path::PathBuf;

/// Questboard learning dashboard
#[derive(Debug, Parser)]
#[command(name = "qb", version, about = "Questboard learning dashboard over a JSON snapshot")]
pub struct Cli {
    /// Snapshot file holding every table
    #[arg(long, short = 's', default_value = "questboard.json")]
    pub snapshot: PathBuf,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Admin secret, required by commands that change data
    #[arg(long)]
    pub admin_secret: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List sections with their path counts
    Sections,
    /// List the paths of a section
    Paths { section_id: String },
    /// List the levels of a path
    Levels { path_id: String },
    /// Show the ranking board
    Ranking,
    /// Show a user's progress by section and path
    Progress { user_id: String },
    /// Show the latest activity
    Activity {
        /// Entries to show; defaults to the configured limit
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List users, optionally filtered by name
    Users {
        #[arg(long)]
        search: Option<String>,
    },
    /// List the levels a user completed, newest first
    Completions { user_id: String },
    /// Find levels by level, path or section title
    SearchLevels { query: String },
    /// Check a secret against the admin gate
    LoginCheck { secret: String },
    /// Move a section, path or level one place
    Move {
        #[arg(value_parser = parse_table)]
        table: Table,
        id: String,
        direction: MoveDirection,
    },
    /// Copy a level to the end of its path
    DuplicateLevel { id: String },
    /// Edit a level's nested fields and commit
    ///
    /// Edits run in this order: adds, sets, renames, removes. Paths are
    /// pointer style, e.g. `/time_investment/breakdown/design`.
    EditLevel {
        id: String,
        /// Append a default item to a list or map
        #[arg(long, value_name = "POINTER")]
        add: Vec<String>,
        /// Set a field, map value or list item; `{`/`[` values are JSON
        #[arg(long, value_name = "POINTER=VALUE")]
        set: Vec<String>,
        /// Rename a map key
        #[arg(long, value_name = "POINTER=NEW_KEY")]
        rename: Vec<String>,
        /// Remove a list item or map entry
        #[arg(long, value_name = "POINTER")]
        remove: Vec<String>,
    },
}

impl Command {
    /// Check if the command changes the snapshot
    #[must_use]
    pub fn mutates(&self) -> bool {
        matches!(self, Self::Move { .. } | Self::DuplicateLevel { .. } | Self::EditLevel { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(d: MoveDirection) -> Self {
        match d {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

fn parse_table(s: &str) -> Result<Table, String> {
    match s.parse::<Table>()? {
        t @ (Table::Sections | Table::Paths | Table::Levels) => Ok(t),
        other => Err(format!("{other} cannot be reordered")),
    }
}
