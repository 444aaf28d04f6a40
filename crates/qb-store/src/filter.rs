//! List filters
//!
//! A [`Filter`] is the store-independent form of a list query: equality
//! conditions, an optional sort column and an optional row limit. Stores
//! that evaluate queries locally use [`Filter::apply`].

use crate::Row;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Sort key and direction
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// List query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    eq: Vec<(String, Value)>,
    order: Option<OrderBy>,
    limit: Option<usize>,
}

impl Filter {
    /// Match every row
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `column == value`
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    /// Sort ascending by column
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            ascending: true,
        });
        self
    }

    /// Sort descending by column
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            ascending: false,
        });
        self
    }

    /// Keep at most `n` rows
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Equality conditions
    #[inline]
    #[must_use]
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.eq
    }

    /// Sort key and direction
    #[inline]
    #[must_use]
    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    /// Row limit
    #[inline]
    #[must_use]
    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Check if a row satisfies every condition
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.eq
            .iter()
            .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
    }

    /// Filter, sort and truncate rows
    ///
    /// Ties on the sort column fall back to `id`, so equal or duplicated
    /// order values still produce a stable listing.
    #[must_use]
    pub fn apply(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut out: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if let Some(order) = &self.order {
            out.sort_by(|a, b| {
                let primary = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                let primary = if order.ascending { primary } else { primary.reverse() };
                primary.then_with(|| {
                    compare_values(
                        a.get("id").unwrap_or(&Value::Null),
                        b.get("id").unwrap_or(&Value::Null),
                    )
                })
            });
        }
        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}

impl fmt::Display for Filter {
    /// Canonical text, used as part of cache keys
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (column, value) in &self.eq {
            if !first {
                f.write_str("&")?;
            }
            first = false;
            write!(f, "{column}=eq.{value}")?;
        }
        if let Some(order) = &self.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            write!(f, "{}order={}.{dir}", if first { "" } else { "&" }, order.column)?;
            first = false;
        }
        if let Some(n) = self.limit {
            write!(f, "{}limit={n}", if first { "" } else { "&" })?;
        }
        Ok(())
    }
}

/// Total order over JSON scalars: null, bools, numbers, strings, then the rest
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn eq_conditions() {
        let f = Filter::all().eq("path_id", "p1");
        assert!(f.matches(&row(json!({"path_id": "p1"}))));
        assert!(!f.matches(&row(json!({"path_id": "p2"}))));
        assert!(!f.matches(&row(json!({}))));
    }

    #[test]
    fn sort_ties_fall_back_to_id() {
        let rows = vec![
            row(json!({"id": "b", "rank": 1})),
            row(json!({"id": "a", "rank": 1})),
            row(json!({"id": "c", "rank": 0})),
        ];
        let out = Filter::all().order_by("rank").apply(rows);
        let ids: Vec<_> = out.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn descending_with_limit() {
        let rows = (0..10).map(|i| row(json!({"id": format!("{i}"), "created_at": i})));
        let out = Filter::all().order_by_desc("created_at").limit(3).apply(rows);
        let seen: Vec<_> = out.iter().map(|r| r["created_at"].as_i64().unwrap()).collect();
        assert_eq!(seen, vec![9, 8, 7]);
    }

    #[test]
    fn display_is_canonical() {
        let f = Filter::all().eq("section_id", "s1").order_by("order").limit(5);
        assert_eq!(f.to_string(), "section_id=eq.\"s1\"&order=order.asc&limit=5");
        assert_eq!(Filter::all().to_string(), "");
    }
}
