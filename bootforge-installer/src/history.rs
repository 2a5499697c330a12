//! Flash history persistence (line-delimited JSON).
//!
//! The engine produces in-memory audit entries; this module is the
//! collaborator that persists them, one JSON object per line, append-only.

use anyhow::{Context, Result};
use bootforge_core::flash::AuditEntry;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub fn append(path: &Path, entry: &AuditEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open history file {}", path.display()))?;
    let line = serde_json::to_string(entry).context("failed to encode audit entry")?;
    writeln!(file, "{}", line)
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read history file {}", path.display()))?;
    let mut entries = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line).with_context(|| {
            format!("corrupt history entry at {}:{}", path.display(), number + 1)
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn show(path: &Path, limit: usize) -> Result<()> {
    let entries = load(path)?;
    if entries.is_empty() {
        println!("No flash history at {}", path.display());
        return Ok(());
    }
    for entry in entries.iter().rev().take(limit) {
        println!(
            "[{}] session {}  {}  {} -> {}  ({} bytes)",
            entry.timestamp_unix_ms,
            entry.session_id,
            entry.outcome,
            entry.image,
            entry.device_id,
            entry.bytes_written
        );
    }
    Ok(())
}
