//! Document shapes
//!
//! A [`Shape`] says, per field, whether a value is a list, a map with
//! user-editable keys, or a fixed record, and how to build its default. Raw
//! JSON from the store is decoded against a shape so absent or malformed
//! fields come back with their default instead of being patched over at
//! every access point.

use crate::node::{Entries, Node};
use crate::path::DocPath;
use serde_json::{Number, Value};
use std::sync::Arc;

/// Default text of a freshly added duration
pub const DEFAULT_DURATION: &str = "0 hours";

/// Named field of a record shape
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub name: &'static str,
    /// Field shape
    pub shape: Shape,
}

impl Field {
    /// Create field
    #[inline]
    #[must_use]
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self { name, shape }
    }
}

/// Schema of one document position
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Free text, default `""`
    Text,
    /// Free-form duration text such as `"2 hours"`, default [`DEFAULT_DURATION`]
    Duration,
    /// Number, default `0`
    Number,
    /// Boolean, default `false`
    Bool,
    /// Anything; decoded without interpretation, default null
    Any,
    /// Ordered list of items
    List(Box<Shape>),
    /// Map from user-editable keys to values
    Map(Box<Shape>),
    /// Fixed record; unknown fields are kept after the declared ones
    Record(Vec<Field>),
}

impl Shape {
    /// List of `item`
    #[inline]
    #[must_use]
    pub fn list(item: Shape) -> Self {
        Self::List(Box::new(item))
    }

    /// Map of `value`
    #[inline]
    #[must_use]
    pub fn map(value: Shape) -> Self {
        Self::Map(Box::new(value))
    }

    /// Record from `(name, shape)` pairs
    #[must_use]
    pub fn record(fields: impl IntoIterator<Item = (&'static str, Shape)>) -> Self {
        Self::Record(fields.into_iter().map(|(n, s)| Field::new(n, s)).collect())
    }

    /// Shape of list items or map values
    #[inline]
    #[must_use]
    pub fn item_shape(&self) -> Option<&Shape> {
        match self {
            Self::List(item) | Self::Map(item) => Some(item),
            _ => None,
        }
    }

    /// Shape of a named record field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Shape> {
        match self {
            Self::Record(fields) => fields.iter().find(|f| f.name == name).map(|f| &f.shape),
            _ => None,
        }
    }

    /// Walk a path through the schema
    ///
    /// List indices and map keys step into the item shape; record fields
    /// step into the field shape. Returns `None` past an `Any` or an
    /// undeclared record field.
    #[must_use]
    pub fn resolve(&self, path: &DocPath) -> Option<&Shape> {
        let mut current = self;
        for seg in path.iter() {
            current = match current {
                Self::List(item) | Self::Map(item) => item,
                Self::Record(_) => current.field(seg)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Build the default node for this shape
    #[must_use]
    pub fn default_node(&self) -> Node {
        match self {
            Self::Text => Node::Text(String::new()),
            Self::Duration => Node::text(DEFAULT_DURATION),
            Self::Number => Node::Number(Number::from(0)),
            Self::Bool => Node::Bool(false),
            Self::Any => Node::Null,
            Self::List(_) => Node::List(Vec::new()),
            Self::Map(_) => Node::Map(Entries::new()),
            Self::Record(fields) => Node::Record(
                fields
                    .iter()
                    .map(|f| (f.name.to_string(), Arc::new(f.shape.default_node())))
                    .collect(),
            ),
        }
    }

    /// Decode a JSON value against this shape
    ///
    /// `None` and `null` produce the default. Values of the wrong kind are
    /// replaced by the default with a warning, except scalars, which are
    /// coerced to text where the shape asks for text.
    #[must_use]
    pub fn decode(&self, value: Option<&Value>) -> Node {
        let value = match value {
            None | Some(Value::Null) => return self.default_node(),
            Some(v) => v,
        };
        match (self, value) {
            (Self::Any, v) => Node::from_json(v),
            (Self::Text | Self::Duration, Value::String(s)) => Node::Text(s.clone()),
            (Self::Text | Self::Duration, Value::Number(n)) => Node::Text(n.to_string()),
            (Self::Text | Self::Duration, Value::Bool(b)) => Node::Text(b.to_string()),
            (Self::Number, Value::Number(n)) => Node::Number(n.clone()),
            (Self::Number, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Node::Number(Number::from(n)),
                Err(_) => {
                    tracing::warn!(text = %s, "non-numeric text where a number is expected");
                    self.default_node()
                }
            },
            (Self::Bool, Value::Bool(b)) => Node::Bool(*b),
            (Self::List(item), Value::Array(items)) => Node::List(
                items
                    .iter()
                    .map(|v| Arc::new(item.decode(Some(v))))
                    .collect(),
            ),
            (Self::Map(item), Value::Object(entries)) => Node::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Arc::new(item.decode(Some(v)))))
                    .collect(),
            ),
            (Self::Record(fields), Value::Object(raw)) => {
                let mut out = Entries::with_capacity(raw.len().max(fields.len()));
                for field in fields {
                    out.insert(
                        field.name.to_string(),
                        Arc::new(field.shape.decode(raw.get(field.name))),
                    );
                }
                for (k, v) in raw {
                    if !out.contains_key(k) {
                        out.insert(k.clone(), Arc::new(Node::from_json(v)));
                    }
                }
                Node::Record(out)
            }
            (shape, v) => {
                tracing::warn!(
                    expected = shape.kind_name(),
                    found = json_kind(v),
                    "value does not match shape, using default"
                );
                shape.default_node()
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Duration => "duration",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Any => "any",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
