//! JSON snapshot file holding every table

use anyhow::{Context, Result};
use qb_store::MemoryStore;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Read a snapshot into a fresh in-memory store
///
/// A missing file yields an empty store so a first run can start from
/// nothing.
///
/// # Errors
/// Unreadable files, invalid JSON, or a document that is not an object of
/// table arrays.
pub fn load(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "snapshot not found, starting empty");
        return Ok(MemoryStore::new());
    }
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let store = MemoryStore::from_snapshot(&value).with_context(|| format!("{} is not a table snapshot", path.display()))?;
    tracing::debug!(path = %path.display(), "snapshot loaded");
    Ok(store)
}

/// Write a snapshot, replacing `path` atomically
///
/// # Errors
/// I/O failures while writing or renaming the temporary file.
pub fn save(path: &Path, snapshot: &Value) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).with_context(|| format!("cannot write to {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, snapshot)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("cannot replace {}", path.display()))?;
    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}
