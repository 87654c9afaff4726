//! Wizard stages and the remote calls that can hold the busy slot.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four wizard stages, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Upload,
    Context,
    Review,
    Publish,
}

impl Stage {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Context => "context",
            Stage::Review => "review",
            Stage::Publish => "publish",
        }
    }

    /// One-based position shown to users ("step 2 of 4").
    pub fn number(&self) -> u8 {
        match self {
            Stage::Upload => 1,
            Stage::Context => 2,
            Stage::Review => 3,
            Stage::Publish => 4,
        }
    }

    /// Stage reached by an explicit Back action, if Back is offered here.
    pub(crate) fn back_target(&self) -> Option<Stage> {
        match self {
            Stage::Context => Some(Stage::Upload),
            Stage::Review => Some(Stage::Context),
            Stage::Upload | Stage::Publish => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote call currently occupying the busy slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyKind {
    Uploading,
    Analyzing,
    Publishing,
}

impl BusyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusyKind::Uploading => "upload",
            BusyKind::Analyzing => "analysis",
            BusyKind::Publishing => "publish",
        }
    }
}

impl fmt::Display for BusyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
