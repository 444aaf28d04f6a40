//! Typed rows
//!
//! Every table has a serde struct. Columns the application does not model
//! are kept in a flattened map where the row carries free-form data.

use crate::table::Table;
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed view of one table's rows
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table the rows live in
    const TABLE: Table;

    /// Row id
    fn id(&self) -> &str;
}

/// Entity ordered among siblings by an integer column
pub trait Ordered: Entity {
    /// Sort key; not guaranteed contiguous or unique
    fn order(&self) -> i64;
}

/// Top tier of the content hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub order: i64,
}

/// Ordered series of levels inside a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: String,
    pub section_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub hours: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub order: i64,
}

/// One step of a path
///
/// The nested blocks (process, time investment, materials, assessment,
/// rewards) stay as JSON in `details`; they are edited as documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub path_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub rank: i64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// End user whose progress is tracked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A level completed by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: String,
    pub user_id: String,
    pub level_id: String,
    pub completed_at: DateTime<Utc>,
}

/// Kind of activity feed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Completion,
    Started,
    Achievement,
    #[default]
    #[serde(other)]
    Other,
}

/// Activity feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub profile_id: String,
    #[serde(rename = "type", default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

macro_rules! entity {
    ($ty:ty, $table:expr) => {
        impl Entity for $ty {
            const TABLE: Table = $table;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

entity!(Section, Table::Sections);
entity!(LearningPath, Table::Paths);
entity!(Level, Table::Levels);
entity!(Profile, Table::Profiles);
entity!(UserProgress, Table::UserProgress);
entity!(Activity, Table::ActivityLog);

impl Ordered for Section {
    fn order(&self) -> i64 {
        self.order
    }
}

impl Ordered for LearningPath {
    fn order(&self) -> i64 {
        self.order
    }
}

impl Ordered for Level {
    fn order(&self) -> i64 {
        self.rank
    }
}

/// Sort siblings by `(order, id)`
///
/// Order values may be duplicated or gapped after an interrupted reorder;
/// the id tie-break keeps the listing stable regardless.
pub fn sort_siblings<E: Ordered>(items: &mut [E]) {
    items.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.id().cmp(b.id())));
}

/// Accept integers, floats (rounded) and numeric strings; null is zero
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    coerce_int(&value).ok_or_else(|| serde::de::Error::custom(format!("expected integer, found {value}")))
}

/// Integer reading of a JSON value, as stored for hours and order columns
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(0),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}
