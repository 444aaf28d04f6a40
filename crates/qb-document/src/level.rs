//! Level document schema
//!
//! A Level row carries a handful of plain text fields plus four nested
//! blocks. [`level_shape`] describes all of them so a row decodes into a
//! fully defaulted document, and [`ListField`] / [`MapField`] name every
//! editable collection together with the value a new item starts from.

use crate::document::Document;
use crate::node::Node;
use crate::path::DocPath;
use crate::shape::Shape;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Top-level field holding durations edited at high frequency
pub const TIME_INVESTMENT: &str = "time_investment";

/// Level fields owned by the editor, in display order
///
/// Row bookkeeping (`id`, `path_id`, `rank`, timestamps) is not part of the
/// edited document, so a commit never overwrites a concurrent reorder.
pub const EDITABLE_FIELDS: &[&str] = &[
    "title",
    "description",
    "description_extended",
    "info",
    "process",
    TIME_INVESTMENT,
    "learning_materials",
    "assessment",
    "rewards_extended",
];

/// Schema of a Level's editable fields
#[must_use]
pub fn level_shape() -> &'static Shape {
    static SHAPE: OnceLock<Shape> = OnceLock::new();
    SHAPE.get_or_init(|| {
        let texts = |names: &[&'static str]| -> Shape {
            Shape::record(names.iter().map(|n| (*n, Shape::Text)))
        };
        Shape::record([
            ("title", Shape::Text),
            ("description", Shape::Text),
            ("description_extended", Shape::Text),
            ("info", Shape::Text),
            ("process", Shape::list(Shape::Text)),
            (
                TIME_INVESTMENT,
                Shape::record([
                    ("breakdown", Shape::map(Shape::Duration)),
                    (
                        "totals",
                        Shape::map(Shape::record([
                            ("total", Shape::Duration),
                            ("details", Shape::map(Shape::Duration)),
                        ])),
                    ),
                ]),
            ),
            (
                "learning_materials",
                Shape::record([
                    ("technieken", Shape::list(Shape::Text)),
                    ("tools", Shape::list(texts(&["name", "url"]))),
                    (
                        "courses",
                        Shape::list(texts(&["title", "type", "note", "url"])),
                    ),
                    ("youtube_channels", Shape::list(Shape::Text)),
                ]),
            ),
            (
                "assessment",
                Shape::record([
                    ("main_task", Shape::Text),
                    ("focus_points", Shape::list(Shape::Text)),
                    (
                        "presentation",
                        Shape::record([
                            ("duration", Shape::Text),
                            (
                                "components",
                                Shape::list(texts(&["type", "duration", "description"])),
                            ),
                        ]),
                    ),
                ]),
            ),
            (
                "rewards_extended",
                Shape::record([
                    ("recognition", Shape::Text),
                    ("skills", Shape::Text),
                    (
                        "toolkit",
                        Shape::record([("title", Shape::Text), ("items", Shape::list(Shape::Text))]),
                    ),
                    (
                        "gift",
                        Shape::record([("amount", Shape::Text), ("options", Shape::list(Shape::Text))]),
                    ),
                    (
                        "certificate",
                        Shape::record([
                            ("title", Shape::Text),
                            ("formats", Shape::list(Shape::Text)),
                        ]),
                    ),
                ]),
            ),
        ])
    })
}

/// Decode the editable part of a Level row
///
/// Only [`EDITABLE_FIELDS`] are taken from `row`; everything else in the row
/// stays with the store.
#[must_use]
pub fn decode_level(row: &Value) -> Document {
    let mut fields = Map::new();
    if let Value::Object(raw) = row {
        for name in EDITABLE_FIELDS {
            if let Some(v) = raw.get(*name) {
                fields.insert((*name).to_string(), v.clone());
            }
        }
    }
    Document::decode(level_shape(), &Value::Object(fields))
}

/// Ordered list fields of a Level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListField {
    ProcessSteps,
    Techniques,
    Tools,
    Courses,
    YoutubeChannels,
    FocusPoints,
    PresentationComponents,
    ToolkitItems,
    GiftOptions,
    CertificateFormats,
}

impl ListField {
    /// Every list field
    pub const ALL: [Self; 10] = [
        Self::ProcessSteps,
        Self::Techniques,
        Self::Tools,
        Self::Courses,
        Self::YoutubeChannels,
        Self::FocusPoints,
        Self::PresentationComponents,
        Self::ToolkitItems,
        Self::GiftOptions,
        Self::CertificateFormats,
    ];

    fn segments(self) -> &'static [&'static str] {
        match self {
            Self::ProcessSteps => &["process"],
            Self::Techniques => &["learning_materials", "technieken"],
            Self::Tools => &["learning_materials", "tools"],
            Self::Courses => &["learning_materials", "courses"],
            Self::YoutubeChannels => &["learning_materials", "youtube_channels"],
            Self::FocusPoints => &["assessment", "focus_points"],
            Self::PresentationComponents => &["assessment", "presentation", "components"],
            Self::ToolkitItems => &["rewards_extended", "toolkit", "items"],
            Self::GiftOptions => &["rewards_extended", "gift", "options"],
            Self::CertificateFormats => &["rewards_extended", "certificate", "formats"],
        }
    }

    /// Location of the list in a Level document
    #[must_use]
    pub fn path(self) -> DocPath {
        DocPath::from(self.segments())
    }

    /// Value a newly added item starts with
    #[must_use]
    pub fn default_item(self) -> Node {
        level_shape()
            .resolve(&self.path())
            .and_then(Shape::item_shape)
            .map_or(Node::Null, Shape::default_node)
    }
}

/// Dynamic-key map fields of a Level
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapField {
    /// Activity name to duration
    Breakdown,
    /// Role name to `{total, details}`
    RoleTotals,
    /// Detail name to duration, inside one role
    RoleDetails { role: String },
}

impl MapField {
    /// Location of the map in a Level document
    #[must_use]
    pub fn path(&self) -> DocPath {
        let base = DocPath::single(TIME_INVESTMENT);
        match self {
            Self::Breakdown => base.child("breakdown"),
            Self::RoleTotals => base.child("totals"),
            Self::RoleDetails { role } => base.extend(&["totals", role.as_str(), "details"]),
        }
    }

    /// Prefix of generated placeholder keys
    #[must_use]
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Breakdown => "new_item",
            Self::RoleTotals => "new_role",
            Self::RoleDetails { .. } => "new_detail",
        }
    }

    /// Value a newly added entry starts with
    #[must_use]
    pub fn default_value(&self) -> Node {
        level_shape()
            .resolve(&self.path())
            .and_then(Shape::item_shape)
            .map_or(Node::Null, Shape::default_node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_row_decodes_to_full_defaults() {
        let doc = decode_level(&json!({}));
        assert_eq!(
            doc.to_json(),
            json!({
                "title": "",
                "description": "",
                "description_extended": "",
                "info": "",
                "process": [],
                "time_investment": {"breakdown": {}, "totals": {}},
                "learning_materials": {"technieken": [], "tools": [], "courses": [], "youtube_channels": []},
                "assessment": {"main_task": "", "focus_points": [], "presentation": {"duration": "", "components": []}},
                "rewards_extended": {
                    "recognition": "",
                    "skills": "",
                    "toolkit": {"title": "", "items": []},
                    "gift": {"amount": "", "options": []},
                    "certificate": {"title": "", "formats": []}
                }
            })
        );
    }

    #[test]
    fn bookkeeping_columns_are_left_out() {
        let doc = decode_level(&json!({"id": "l1", "rank": 3, "path_id": "p1", "title": "Intro"}));
        let root = doc.to_json();
        assert_eq!(root["title"], json!("Intro"));
        assert!(root.get("rank").is_none());
        assert!(root.get("id").is_none());
    }

    #[test]
    fn unknown_nested_fields_survive() {
        let doc = decode_level(&json!({"assessment": {"main_task": "Build", "rubric": [1, 2]}}));
        assert_eq!(doc.to_json()["assessment"]["rubric"], json!([1, 2]));
    }

    #[test]
    fn list_defaults_follow_item_shape() {
        assert_eq!(ListField::ProcessSteps.default_item(), Node::text(""));
        assert_eq!(
            ListField::Tools.default_item().to_json(),
            json!({"name": "", "url": ""})
        );
        assert_eq!(
            ListField::Courses.default_item().to_json(),
            json!({"title": "", "type": "", "note": "", "url": ""})
        );
        assert_eq!(
            ListField::PresentationComponents.default_item().to_json(),
            json!({"type": "", "duration": "", "description": ""})
        );
    }

    #[test]
    fn every_list_field_resolves() {
        for field in ListField::ALL {
            assert!(
                matches!(level_shape().resolve(&field.path()), Some(Shape::List(_))),
                "{field:?}"
            );
        }
    }

    #[test]
    fn map_defaults() {
        assert_eq!(MapField::Breakdown.default_value(), Node::text("0 hours"));
        assert_eq!(
            MapField::RoleTotals.default_value().to_json(),
            json!({"total": "0 hours", "details": {}})
        );
        let details = MapField::RoleDetails { role: "dev".into() };
        assert_eq!(details.path().to_string(), "/time_investment/totals/dev/details");
        assert_eq!(details.default_value(), Node::text("0 hours"));
        assert_eq!(details.key_prefix(), "new_detail");
    }
}
