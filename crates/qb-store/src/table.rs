//! Store tables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tables reachable through the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Sections,
    Paths,
    Levels,
    Profiles,
    UserProgress,
    ActivityLog,
}

impl Table {
    /// Every table
    pub const ALL: [Self; 6] = [
        Self::Sections,
        Self::Paths,
        Self::Levels,
        Self::Profiles,
        Self::UserProgress,
        Self::ActivityLog,
    ];

    /// Store-side table name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::Paths => "paths",
            Self::Levels => "levels",
            Self::Profiles => "profiles",
            Self::UserProgress => "user_progress",
            Self::ActivityLog => "activity_log",
        }
    }

    /// Tables whose cached views embed data from this one
    ///
    /// Section listings carry path counts, progress views carry level
    /// counts and titles, and ranking and activity views carry profiles.
    #[must_use]
    pub fn dependents(self) -> &'static [Table] {
        match self {
            Self::Paths => &[Self::Sections],
            Self::Levels => &[Self::Paths, Self::UserProgress],
            Self::Profiles => &[Self::UserProgress, Self::ActivityLog],
            Self::Sections | Self::UserProgress | Self::ActivityLog => &[],
        }
    }

    /// Column holding the sort key among siblings, if the table is ordered
    #[must_use]
    pub fn order_column(self) -> Option<&'static str> {
        match self {
            Self::Sections | Self::Paths => Some("order"),
            Self::Levels => Some("rank"),
            _ => None,
        }
    }

    /// Column pointing at the parent row, if any
    #[must_use]
    pub fn parent_column(self) -> Option<(&'static str, Table)> {
        match self {
            Self::Paths => Some(("section_id", Self::Sections)),
            Self::Levels => Some(("path_id", Self::Paths)),
            _ => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), table);
        }
        assert!("nope".parse::<Table>().is_err());
    }

    #[test]
    fn ordered_tables() {
        assert_eq!(Table::Levels.order_column(), Some("rank"));
        assert_eq!(Table::Sections.order_column(), Some("order"));
        assert_eq!(Table::Profiles.order_column(), None);
    }
}
