//! Load and persist the workflow snapshot.
use super::WorkspacePaths;
use crate::workflow::WorkflowSnapshot;
use anyhow::{Context, Result};
use std::fs;

/// Load `workflow.json`; a missing file yields a fresh snapshot.
pub fn load_snapshot(paths: &WorkspacePaths) -> Result<WorkflowSnapshot> {
    let path = paths.workflow_path();
    if !path.is_file() {
        return Ok(WorkflowSnapshot::default());
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let snapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse workflow snapshot {}", path.display()))?;
    Ok(snapshot)
}

/// Persist a snapshot in stable pretty JSON.
pub fn write_snapshot(paths: &WorkspacePaths, snapshot: &WorkflowSnapshot) -> Result<()> {
    let path = paths.workflow_path();
    fs::create_dir_all(paths.root()).context("create workspace dir")?;
    let text = serde_json::to_string_pretty(snapshot).context("serialize workflow snapshot")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
