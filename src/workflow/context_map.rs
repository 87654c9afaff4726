//! Per-file context hints passed verbatim to the analysis call.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from uploaded filename to a free-text hint. Hints may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextMap(BTreeMap<String, String>);

impl ContextMap {
    /// Insert or replace the hint for one file (last write wins).
    ///
    /// Crate-private: edits go through `Workflow::set_context`, which checks
    /// the filename against the current session.
    pub(crate) fn set(&mut self, filename: impl Into<String>, hint: impl Into<String>) {
        self.0.insert(filename.into(), hint.into());
    }

    pub fn hint(&self, filename: &str) -> Option<&str> {
        self.0.get(filename).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}
