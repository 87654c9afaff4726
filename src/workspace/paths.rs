//! Typed paths into a workspace directory.
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "shutterstacker";

/// Locates the files the CLI keeps under one workspace root.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `workflow.json` snapshot path.
    pub fn workflow_path(&self) -> PathBuf {
        self.root.join("workflow.json")
    }

    /// Return the `publish_history.jsonl` path.
    pub fn history_path(&self) -> PathBuf {
        self.root.join("publish_history.jsonl")
    }
}

/// Default workspace: `<data local dir>/shutterstacker/workspace`.
pub fn default_workspace_root() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine local data directory"))?;
    Ok(base.join(APP_DIR).join("workspace"))
}
