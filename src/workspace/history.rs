//! Append-only publish history.
use super::WorkspacePaths;
use crate::workflow::LogLine;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// One finished publish, as recorded in `publish_history.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishHistoryEntry {
    pub at_epoch_ms: u128,
    pub session_id: String,
    pub project_name: String,
    pub lines: Vec<LogLine>,
}

pub fn now_epoch_ms() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("compute timestamp")?
        .as_millis())
}

/// Append a history entry as JSONL.
pub fn append_history(paths: &WorkspacePaths, entry: &PublishHistoryEntry) -> Result<()> {
    let path = paths.history_path();
    fs::create_dir_all(paths.root()).context("create workspace dir")?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize publish history entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read every recorded entry, oldest first. A missing file is an empty history.
pub fn read_history(paths: &WorkspacePaths) -> Result<Vec<PublishHistoryEntry>> {
    let path = paths.history_path();
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse {} line {}", path.display(), idx + 1))
        })
        .collect()
}
