//! Level edits given on the command line
//!
//! Each edit names a pointer into the level document. What it does depends
//! on the kind of node found there: records take field sets, maps take
//! entry edits and renames, lists take item edits.

use anyhow::{anyhow, bail, Context, Result};
use qb_document::{level_shape, DocPath, EditOp, MapField, Node, Shape};
use qb_editor::{EditSession, RenameOutcome};
use serde_json::Value;

/// One requested edit
#[derive(Debug, Clone, PartialEq)]
pub enum LevelEdit {
    /// Append a default item to the list or map at `path`
    Add { path: DocPath },
    /// Set the record field, map value or list item at `path`
    Set { path: DocPath, value: Node },
    /// Rename the map entry at `path`
    Rename { path: DocPath, to: String },
    /// Remove the list item or map entry at `path`
    Remove { path: DocPath },
}

impl LevelEdit {
    pub fn add(pointer: &str) -> Result<Self> {
        Ok(Self::Add { path: parse_path(pointer)? })
    }

    /// `POINTER=VALUE`; values starting with `{` or `[` are parsed as JSON
    pub fn set(assignment: &str) -> Result<Self> {
        let (pointer, raw) = split_assignment(assignment)?;
        let value = if raw.starts_with('{') || raw.starts_with('[') {
            let json: Value = serde_json::from_str(raw).with_context(|| format!("invalid JSON value in '{assignment}'"))?;
            Node::from_json(&json)
        } else {
            Node::text(raw)
        };
        Ok(Self::Set {
            path: parse_path(pointer)?,
            value,
        })
    }

    /// `POINTER=NEW_KEY`
    pub fn rename(assignment: &str) -> Result<Self> {
        let (pointer, to) = split_assignment(assignment)?;
        Ok(Self::Rename {
            path: parse_path(pointer)?,
            to: to.to_string(),
        })
    }

    pub fn remove(pointer: &str) -> Result<Self> {
        Ok(Self::Remove { path: parse_path(pointer)? })
    }

    /// Run against the session's buffer and describe what happened
    ///
    /// # Errors
    /// Unknown pointers, pointers into scalars, and rejected buffer edits.
    pub fn apply(&self, session: &EditSession) -> Result<String> {
        match self {
            Self::Add { path } => match node_at(session, path)? {
                Node::List(_) => {
                    session.add_list_item(path, item_default(path))?;
                    Ok(format!("added item to {path}"))
                }
                Node::Map(_) => {
                    let key = session.add_map_entry(path, key_prefix(path), item_default(path))?;
                    Ok(format!("added {path}/{key}"))
                }
                other => bail!("{path} is a {}, not a list or map", other.kind()),
            },
            Self::Set { path, value } => {
                let (parent, last) = split_last(path)?;
                match node_at(session, &parent)? {
                    Node::Record(_) => session.set_field(&parent, last, value.clone())?,
                    Node::Map(entries) if entries.contains_key(last) => {
                        session.update_map_value(&parent, last, value.clone())?;
                    }
                    Node::Map(_) => session.apply(&EditOp::AddMapEntry {
                        path: parent.clone(),
                        key: last.to_string(),
                        value: value.clone(),
                    })?,
                    Node::List(_) => session.update_list_item(&parent, parse_index(last)?, value.clone())?,
                    other => bail!("{parent} is a {}, cannot set {last}", other.kind()),
                }
                Ok(format!("set {path}"))
            }
            Self::Rename { path, to } => {
                let (parent, last) = split_last(path)?;
                session.begin_key_rename(&parent, last, to)?;
                match session.commit_key_rename(&parent, last)? {
                    RenameOutcome::Renamed { replaced: true, .. } => {
                        Ok(format!("renamed {path} to {to}, replacing the existing entry"))
                    }
                    RenameOutcome::Renamed { .. } => Ok(format!("renamed {path} to {to}")),
                    RenameOutcome::Unchanged | RenameOutcome::NoPending => Ok(format!("{path} unchanged")),
                    RenameOutcome::Rejected { to } => bail!("cannot rename {path}: key '{to}' already exists"),
                }
            }
            Self::Remove { path } => {
                let (parent, last) = split_last(path)?;
                match node_at(session, &parent)? {
                    Node::List(_) => session.remove_list_item(&parent, parse_index(last)?)?,
                    Node::Map(_) => session.remove_map_entry(&parent, last)?,
                    other => bail!("{parent} is a {}, nothing to remove", other.kind()),
                }
                Ok(format!("removed {path}"))
            }
        }
    }
}

fn parse_path(pointer: &str) -> Result<DocPath> {
    let path: DocPath = pointer.parse().with_context(|| format!("invalid pointer '{pointer}'"))?;
    if path.is_empty() {
        bail!("pointer must name a field");
    }
    Ok(path)
}

fn split_assignment(s: &str) -> Result<(&str, &str)> {
    s.split_once('=')
        .ok_or_else(|| anyhow!("expected POINTER=VALUE, got '{s}'"))
}

fn split_last(path: &DocPath) -> Result<(DocPath, &str)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(last)) => Ok((parent, last)),
        _ => bail!("pointer must name a field"),
    }
}

fn parse_index(segment: &str) -> Result<usize> {
    segment
        .parse()
        .with_context(|| format!("'{segment}' is not a list index"))
}

fn node_at(session: &EditSession, path: &DocPath) -> Result<Node> {
    session
        .buffer()
        .get(path)
        .map(|n| (**n).clone())
        .ok_or_else(|| anyhow!("{path} does not exist"))
}

fn item_default(path: &DocPath) -> Node {
    level_shape()
        .resolve(path)
        .and_then(Shape::item_shape)
        .map_or_else(|| Node::text(""), Shape::default_node)
}

fn key_prefix(path: &DocPath) -> &'static str {
    let segments: Vec<&str> = path.iter().collect();
    match segments.as_slice() {
        ["time_investment", "totals"] => MapField::RoleTotals.key_prefix(),
        ["time_investment", "totals", role, "details"] => MapField::RoleDetails {
            role: (*role).to_string(),
        }
        .key_prefix(),
        _ => MapField::Breakdown.key_prefix(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qb_editor::EditorConfig;
    use qb_store::RemoteStore;
    use qb_test_utils::sample_store;
    use serde_json::json;
    use std::sync::Arc;

    async fn session() -> EditSession {
        let store: Arc<dyn RemoteStore> = sample_store();
        EditSession::open_level(store, "l-1", EditorConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn set_targets_record_map_and_list() {
        let s = session().await;
        LevelEdit::set("/title=Borrowing").unwrap().apply(&s).unwrap();
        LevelEdit::set("/time_investment/breakdown/design=4 hours").unwrap().apply(&s).unwrap();
        LevelEdit::set("/time_investment/breakdown/test=1 hours").unwrap().apply(&s).unwrap();
        LevelEdit::set("/process/1=Pair on the exercises").unwrap().apply(&s).unwrap();
        LevelEdit::set(r#"/learning_materials/tools/0={"name":"cargo","url":""}"#)
            .unwrap()
            .apply(&s)
            .unwrap();

        let doc = s.buffer().to_json();
        assert_eq!(doc["title"], json!("Borrowing"));
        assert_eq!(
            doc["time_investment"]["breakdown"],
            json!({"design": "4 hours", "build": "6 hours", "test": "1 hours"})
        );
        assert_eq!(doc["process"][1], json!("Pair on the exercises"));
        assert_eq!(doc["learning_materials"]["tools"][0]["name"], json!("cargo"));
        s.cancel();
    }

    #[tokio::test]
    async fn add_uses_shape_defaults_and_prefixes() {
        let s = session().await;
        let msg = LevelEdit::add("/time_investment/totals").unwrap().apply(&s).unwrap();
        assert!(msg.contains("/time_investment/totals/new_role_"));
        LevelEdit::add("/learning_materials/courses").unwrap().apply(&s).unwrap();
        let msg = LevelEdit::add("/time_investment/totals/developer/details")
            .unwrap()
            .apply(&s)
            .unwrap();
        assert!(msg.contains("new_detail_"));

        let doc = s.buffer().to_json();
        assert_eq!(
            doc["learning_materials"]["courses"][0],
            json!({"title": "", "type": "", "note": "", "url": ""})
        );
        s.cancel();
    }

    #[tokio::test]
    async fn rename_and_remove() {
        let s = session().await;
        LevelEdit::rename("/time_investment/breakdown/design=frontend")
            .unwrap()
            .apply(&s)
            .unwrap();
        let err = LevelEdit::rename("/time_investment/breakdown/build=frontend")
            .unwrap()
            .apply(&s)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        LevelEdit::remove("/process/0").unwrap().apply(&s).unwrap();
        LevelEdit::remove("/time_investment/breakdown/build").unwrap().apply(&s).unwrap();
        let doc = s.buffer().to_json();
        assert_eq!(doc["time_investment"]["breakdown"], json!({"frontend": "2 hours"}));
        assert_eq!(doc["process"], json!(["Do the exercises", "Present"]));
        s.cancel();
    }

    #[test]
    fn malformed_arguments() {
        assert!(LevelEdit::set("/title").is_err());
        assert!(LevelEdit::add("").is_err());
        assert!(LevelEdit::set("/x={not json").is_err());
    }

    #[tokio::test]
    async fn scalar_targets_are_refused() {
        let s = session().await;
        assert!(LevelEdit::add("/title").unwrap().apply(&s).is_err());
        assert!(LevelEdit::set("/title/x=1").unwrap().apply(&s).is_err());
        assert!(LevelEdit::set("/nope/x=1").unwrap().apply(&s).is_err());
    }
}
