//! Tagged publish log lines and aggregation of structured publish results.
use serde::{Deserialize, Serialize};
use std::fmt;

/// First line written when a publish call starts.
pub const INITIATING_MESSAGE: &str = "Initiating process...";

/// Emitted when a completed publish reports no outcomes at all. The service
/// cannot tell "nothing to do" apart from a silent failure, so say so.
pub const NO_RESULTS_MESSAGE: &str = "Process complete (Likely no files or all errors silent).";

/// Classification of a publish log line, used for styling and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTag {
    Info,
    Success,
    TransferError,
    EmbedError,
    Error,
    Critical,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Info => "info",
            LogTag::Success => "success",
            LogTag::TransferError => "transfer_error",
            LogTag::EmbedError => "embed_error",
            LogTag::Error => "error",
            LogTag::Critical => "critical",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, LogTag::Info | LogTag::Success)
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One publish outcome message with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub tag: LogTag,
    pub message: String,
}

impl LogLine {
    pub fn new(tag: LogTag, message: impl Into<String>) -> Self {
        Self {
            tag,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogTag::Info, message)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            LogTag::Info => f.write_str(&self.message),
            LogTag::Success => write!(f, "[SUCCESS] Uploaded: {}", self.message),
            LogTag::TransferError => write!(f, "[FTP ERROR] {}", self.message),
            LogTag::EmbedError => write!(f, "[EMBED ERROR] {}", self.message),
            LogTag::Error => write!(f, "[ERROR] {}", self.message),
            LogTag::Critical => write!(f, "[CRITICAL] {}", self.message),
        }
    }
}

/// Flatten a completed publish response into display order.
///
/// Successes come first, then transfer errors, then embedding errors, each
/// keeping its input order. An all-empty response yields exactly one
/// [`NO_RESULTS_MESSAGE`] line, never zero lines.
pub fn aggregate(
    uploaded: &[String],
    transfer_errors: &[String],
    embed_errors: &[String],
) -> Vec<LogLine> {
    let tagged = |tag: LogTag, items: &[String]| {
        items
            .iter()
            .map(move |item| LogLine::new(tag, item.clone()))
            .collect::<Vec<_>>()
    };
    let mut lines = tagged(LogTag::Success, uploaded);
    lines.extend(tagged(LogTag::TransferError, transfer_errors));
    lines.extend(tagged(LogTag::EmbedError, embed_errors));
    if lines.is_empty() {
        lines.push(LogLine::info(NO_RESULTS_MESSAGE));
    }
    lines
}
