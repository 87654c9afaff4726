//! Error taxonomy for the workflow controller.
//!
//! Two kinds of outcome are kept apart: [`WorkflowError`] is what a remote
//! call reports once it has been issued, [`Refusal`] is why an operation did
//! nothing at all before any request was built.
use super::stage::{BusyKind, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which stored credential a gated operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Key for the analysis provider.
    ApiKey,
    /// Username and password for the stock host transfer.
    TransferAuth,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ApiKey => f.write_str("analysis API key"),
            CredentialKind::TransferAuth => f.write_str("transfer username/password"),
        }
    }
}

/// Failures surfaced by the workflow after a remote call was issued.
///
/// `CredentialsMissing` is part of the taxonomy but never reaches
/// `last_error`; it is produced as a [`Refusal`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Missing credentials: {0}")]
    CredentialsMissing(CredentialKind),

    #[error("Publish rejected: {0}")]
    PublishRejected(String),

    #[error("{0}")]
    PublishTransportFailure(String),
}

/// Why an operation was a no-op. No remote call was made and no state changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("{0} already in progress")]
    Busy(BusyKind),

    #[error("no files selected")]
    EmptyBatch,

    #[error("operation requires the {expected} stage (current stage: {actual})")]
    WrongStage { expected: Stage, actual: Stage },

    #[error("no uploaded session")]
    NoSession,

    #[error("missing credentials: {0}")]
    CredentialsMissing(CredentialKind),
}

impl Refusal {
    /// The credential to prompt for, when this refusal is a credential redirect.
    pub fn missing_credential(&self) -> Option<CredentialKind> {
        match self {
            Refusal::CredentialsMissing(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Rejected context edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no uploaded session to annotate")]
    NoSession,

    #[error("context hints can only be edited on the context stage (current stage: {0})")]
    WrongStage(Stage),

    #[error("{0:?} is not part of the current session")]
    UnknownFile(String),
}
