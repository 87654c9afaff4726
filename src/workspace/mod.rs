//! On-disk state kept by the command-line driver between invocations.
//!
//! A workspace directory holds the last workflow snapshot and an append-only
//! publish history. The library core never touches these files.
mod history;
mod paths;
mod snapshot;

pub use history::{append_history, now_epoch_ms, read_history, PublishHistoryEntry};
pub use paths::{default_workspace_root, WorkspacePaths};
pub use snapshot::{load_snapshot, write_snapshot};
