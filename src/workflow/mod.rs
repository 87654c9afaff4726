//! The upload -> context -> review -> publish wizard.
//!
//! [`Workflow`] owns every piece of per-batch state and is the only thing that
//! mutates it. Remote calls go through [`crate::service::PipelineService`].
mod context_map;
mod error;
mod machine;
mod metadata;
mod publish_log;
mod session;
mod stage;

pub use context_map::ContextMap;
pub use error::{CredentialKind, EditError, Refusal, WorkflowError};
pub use machine::{Completion, Pending, Workflow, WorkflowSnapshot, DEFAULT_PROJECT_NAME};
pub use metadata::{MetadataField, MetadataRecord, MetadataSet, UnknownField};
pub use publish_log::{aggregate, LogLine, LogTag, INITIATING_MESSAGE, NO_RESULTS_MESSAGE};
pub use session::Session;
pub use stage::{BusyKind, Stage};
