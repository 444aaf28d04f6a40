//! Command execution against a loaded snapshot

use crate::cli::{Cli, Command};
use crate::edits::LevelEdit;
use crate::snapshot;
use anyhow::{bail, Context, Result};
use qb_core::{Questboard, QuestboardConfig};
use qb_editor::CommitOutcome;
use qb_store::MoveOutcome;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// What a command printed and whether it succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub ok: bool,
}

impl Report {
    fn ok(text: String) -> Self {
        Self { text, ok: true }
    }
}

/// Run one command
///
/// Mutating commands log in with `--admin-secret` first and write the
/// snapshot back only when they succeed.
///
/// # Errors
/// Unreadable snapshot or config, refused login, or a failed operation.
pub async fn run(cli: Cli) -> Result<Report> {
    let config = match &cli.config {
        Some(path) => QuestboardConfig::load(path)?,
        None => QuestboardConfig::new(),
    };
    let memory = Arc::new(snapshot::load(&cli.snapshot)?);
    let board = Questboard::new(Arc::clone(&memory), config)?;

    if cli.command.mutates() {
        let secret = cli.admin_secret.as_deref().unwrap_or_default();
        if !board.gate().login(secret) {
            bail!("{} needs admin mode; pass a valid --admin-secret", command_name(&cli.command));
        }
    }

    let report = execute(&board, &cli.command, cli.json).await?;
    if cli.command.mutates() {
        snapshot::save(&cli.snapshot, &memory.snapshot())?;
    }
    Ok(report)
}

async fn execute(board: &Questboard, command: &Command, json: bool) -> Result<Report> {
    let session = board.gate().session();
    match command {
        Command::Sections => {
            let sections = board.catalog().sections().await?;
            render(json, &sections, || {
                sections
                    .iter()
                    .map(|s| format!("{}  {}  ({} paths)", s.section.id, s.section.title, s.path_count))
                    .collect()
            })
        }
        Command::Paths { section_id } => {
            let paths = board.catalog().paths(section_id).await?;
            render(json, &paths, || {
                paths
                    .iter()
                    .map(|p| format!("{}  {}  {}h", p.id, p.title, p.hours))
                    .collect()
            })
        }
        Command::Levels { path_id } => {
            let levels = board.catalog().levels(path_id).await?;
            render(json, &levels, || {
                levels
                    .iter()
                    .map(|l| format!("{:>3}. {}  {}", l.rank + 1, l.id, l.title))
                    .collect()
            })
        }
        Command::Ranking => {
            let entries = board.ranking().await?;
            render(json, &entries, || {
                entries
                    .iter()
                    .map(|e| {
                        let trophy = e.trophy.map(|t| format!(" [{t}]")).unwrap_or_default();
                        format!(
                            "{:>3}. {}  {} levels{trophy}",
                            e.rank, e.profile.full_name, e.completed_levels
                        )
                    })
                    .collect()
            })
        }
        Command::Progress { user_id } => {
            let sections = board.progress(user_id).await?;
            render(json, &sections, || {
                let mut lines = Vec::new();
                for s in &sections {
                    lines.push(s.section_title.clone());
                    for p in &s.paths {
                        let current = p.current_level.as_deref().unwrap_or("-");
                        lines.push(format!(
                            "  {}  {}/{} ({}%)  current: {current}",
                            p.path_title, p.completed, p.total, p.percent
                        ));
                    }
                }
                lines
            })
        }
        Command::Activity { limit } => {
            let feed = match limit {
                Some(n) => qb_core::recent_activity(board.store(), *n).await?,
                None => board.activity().await?,
            };
            render(json, &feed, || {
                feed.iter()
                    .map(|e| {
                        format!(
                            "{}  {}  {}",
                            e.created_at.format("%Y-%m-%d %H:%M"),
                            e.profile_name.as_deref().unwrap_or("(deleted user)"),
                            e.description
                        )
                    })
                    .collect()
            })
        }
        Command::Users { search } => {
            let profiles = board.users().profiles(search.as_deref()).await?;
            render(json, &profiles, || {
                profiles.iter().map(|p| format!("{}  {}", p.id, p.full_name)).collect()
            })
        }
        Command::Completions { user_id } => {
            let done = board.users().completions(user_id).await?;
            render(json, &done, || {
                done.iter()
                    .map(|c| {
                        format!(
                            "{}  {} / {} / {}",
                            c.completed_at.format("%Y-%m-%d"),
                            c.section_title,
                            c.path_title,
                            c.level_title
                        )
                    })
                    .collect()
            })
        }
        Command::SearchLevels { query } => {
            let hits = board.users().search_levels(query).await?;
            render(json, &hits, || {
                hits.iter()
                    .map(|h| format!("{}  {} / {} / {}", h.level_id, h.section_title, h.path_title, h.level_title))
                    .collect()
            })
        }
        Command::LoginCheck { secret } => {
            let granted = board.gate().login(secret);
            let text = if json {
                serde_json::to_string_pretty(&json!({ "admin": granted }))?
            } else if granted {
                "admin mode granted".to_string()
            } else {
                "secret rejected".to_string()
            };
            Ok(Report { text, ok: granted })
        }
        Command::Move { table, id, direction } => {
            let outcome = board.catalog().move_item(session, *table, id, (*direction).into()).await?;
            let (moved, text) = match outcome {
                MoveOutcome::Moved { neighbour, order, .. } => {
                    (true, format!("moved {id} to position {order}, swapped with {neighbour}"))
                }
                MoveOutcome::AtEdge => (false, format!("{id} is already at the edge")),
            };
            if json {
                Ok(Report::ok(serde_json::to_string_pretty(&json!({ "id": id, "moved": moved }))?))
            } else {
                Ok(Report::ok(text))
            }
        }
        Command::DuplicateLevel { id } => {
            let copy = board.catalog().duplicate_level(session, id).await?;
            render(json, &copy, || vec![format!("duplicated {id} as {} ({})", copy.id, copy.title)])
        }
        Command::EditLevel {
            id,
            add,
            set,
            rename,
            remove,
        } => edit_level(board, id, add, set, rename, remove, json).await,
    }
}

async fn edit_level(
    board: &Questboard,
    id: &str,
    add: &[String],
    set: &[String],
    rename: &[String],
    remove: &[String],
    json: bool,
) -> Result<Report> {
    let mut edits = Vec::new();
    edits.extend(add.iter().map(|a| LevelEdit::add(a)).collect::<Result<Vec<_>>>()?);
    edits.extend(set.iter().map(|a| LevelEdit::set(a)).collect::<Result<Vec<_>>>()?);
    edits.extend(rename.iter().map(|a| LevelEdit::rename(a)).collect::<Result<Vec<_>>>()?);
    edits.extend(remove.iter().map(|a| LevelEdit::remove(a)).collect::<Result<Vec<_>>>()?);
    if edits.is_empty() {
        bail!("nothing to edit; pass --add, --set, --rename or --remove");
    }

    let session = board.edit_level(id).await?;
    let mut lines = Vec::with_capacity(edits.len() + 1);
    for edit in &edits {
        match edit.apply(&session) {
            Ok(line) => lines.push(line),
            Err(e) => {
                session.cancel();
                return Err(e.context(format!("edit of level {id} abandoned")));
            }
        }
    }
    let outcome = session.commit().await.context("commit failed")?;
    lines.push(match outcome {
        CommitOutcome::Sent => format!("level {id} saved"),
        CommitOutcome::Clean => format!("level {id} unchanged"),
    });

    if json {
        let doc = session.committed().to_json();
        Ok(Report::ok(serde_json::to_string_pretty(&doc)?))
    } else {
        Ok(Report::ok(lines.join("\n")))
    }
}

fn render<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> Vec<String>) -> Result<Report> {
    if json {
        return Ok(Report::ok(serde_json::to_string_pretty(value)?));
    }
    let lines = text();
    if lines.is_empty() {
        return Ok(Report::ok("(none)".to_string()));
    }
    Ok(Report::ok(lines.join("\n")))
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Move { .. } => "move",
        Command::DuplicateLevel { .. } => "duplicate-level",
        Command::EditLevel { .. } => "edit-level",
        _ => "this command",
    }
}
