//! Tagged document nodes
//!
//! A document is a tree of [`Node`]s. Children are held behind [`Arc`] so
//! that a working copy shares every subtree with the value it was cloned
//! from until an edit touches it.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Shared child pointer
pub type NodeRef = Arc<Node>;

/// Ordered entries of a map or record node
pub type Entries = IndexMap<String, NodeRef>;

/// One node of a nested document
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// JSON null
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar (kept lossless)
    Number(Number),
    /// Text scalar
    Text(String),
    /// Ordered list; order is meaningful
    List(Vec<NodeRef>),
    /// Map from user-editable labels to values
    Map(Entries),
    /// Fixed-shape record with known field names
    Record(Entries),
}

/// Discriminant of a [`Node`], used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Null,
    Bool,
    Number,
    Text,
    List,
    Map,
    Record,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "text",
            Self::List => "list",
            Self::Map => "map",
            Self::Record => "record",
        };
        f.write_str(name)
    }
}

impl Node {
    /// Text node
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// List node from owned children
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Self::List(items.into_iter().map(Arc::new).collect())
    }

    /// Map node from `(key, value)` pairs, preserving order
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v)))
                .collect(),
        )
    }

    /// Record node from `(field, value)` pairs, preserving order
    #[must_use]
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v)))
                .collect(),
        )
    }

    /// Node kind
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Null => NodeKind::Null,
            Self::Bool(_) => NodeKind::Bool,
            Self::Number(_) => NodeKind::Number,
            Self::Text(_) => NodeKind::Text,
            Self::List(_) => NodeKind::List,
            Self::Map(_) => NodeKind::Map,
            Self::Record(_) => NodeKind::Record,
        }
    }

    /// Text content, if this is a text node
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List items, if this is a list node
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[NodeRef]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entries, if this is a map or record node
    #[inline]
    #[must_use]
    pub fn as_entries(&self) -> Option<&Entries> {
        match self {
            Self::Map(entries) | Self::Record(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up one path segment below this node
    ///
    /// Lists take a decimal index, maps and records take a key.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&NodeRef> {
        match self {
            Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Self::Map(entries) | Self::Record(entries) => entries.get(segment),
            _ => None,
        }
    }

    /// Convert untyped JSON into nodes
    ///
    /// Objects become records; callers that know an object holds
    /// user-editable keys decode it through a [`Shape`](crate::Shape).
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(|v| Arc::new(Self::from_json(v))).collect()),
            Value::Object(fields) => Self::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Arc::new(Self::from_json(v))))
                    .collect(),
            ),
        }
    }

    /// Convert back to JSON, keeping entry order
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(|n| n.to_json()).collect()),
            Self::Map(entries) | Self::Record(entries) => {
                let mut out = Map::with_capacity(entries.len());
                for (k, v) in entries {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip_keeps_entry_order() {
        let value = json!({"zeta": 1, "alpha": [true, null, "x"], "mid": {"b": 2, "a": 1}});
        let node = Node::from_json(&value);
        let back = node.to_json();
        let keys: Vec<_> = back.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(back, value);
    }

    #[test]
    fn child_lookup_by_index_and_key() {
        let node = Node::record([("steps", Node::list(["a".into(), "b".into()]))]);
        let steps = node.child("steps").unwrap();
        assert_eq!(steps.child("1").unwrap().as_text(), Some("b"));
        assert!(steps.child("2").is_none());
        assert!(steps.child("x").is_none());
    }

    #[test]
    fn map_and_record_are_distinct_kinds() {
        let map = Node::map([("k", Node::text("v"))]);
        let record = Node::record([("k", Node::text("v"))]);
        assert_eq!(map.kind(), NodeKind::Map);
        assert_eq!(record.kind(), NodeKind::Record);
        assert_eq!(map.to_json(), record.to_json());
    }
}
