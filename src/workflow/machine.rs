//! Four-stage workflow controller: Upload -> Context -> Review -> Publish.
//!
//! Remote-backed operations run in two phases. `begin_*` checks the guards,
//! claims the single busy slot and returns a [`Pending`] ticket holding the
//! request. `finish_*` applies the service result only while that ticket
//! still owns the busy slot. `reset` and `back` bump the call generation and
//! release the slot, so a response that lands afterwards is reported as
//! [`Completion::Stale`] and dropped.
//!
//! The `submit_upload`, `request_analysis` and `publish` drivers chain both
//! phases around a blocking [`PipelineService`] call.
use super::context_map::ContextMap;
use super::error::{CredentialKind, EditError, Refusal, WorkflowError};
use super::metadata::{MetadataField, MetadataRecord, MetadataSet};
use super::publish_log::{aggregate, LogLine, LogTag, INITIATING_MESSAGE};
use super::session::Session;
use super::stage::{BusyKind, Stage};
use crate::credentials::{CredentialStore, Credentials};
use crate::service::{
    AnalyzeRequest, AnalyzeResponse, PipelineService, PublishRequest, PublishResponse,
    ServiceError, UploadFile, UploadResponse,
};
use serde::{Deserialize, Serialize};

/// Batch label sent with every publish unless the caller overrides it.
pub const DEFAULT_PROJECT_NAME: &str = "Upload_Batch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    kind: BusyKind,
    generation: u64,
}

/// A started remote call. Hand it back to the matching `finish_*`.
#[must_use = "a pending call holds the busy slot until it is finished"]
#[derive(Debug)]
pub struct Pending<R> {
    request: R,
    ticket: InFlight,
}

impl<R> Pending<R> {
    pub fn request(&self) -> &R {
        &self.request
    }
}

/// What applying a remote result did to the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The call succeeded and the stage moved forward.
    Advanced(Stage),
    /// Publish completed; the outcome lists are in the publish log.
    Published,
    /// The call failed; the stage is unchanged.
    Failed(WorkflowError),
    /// The workflow was reset or navigated back while the call was in flight.
    Stale,
}

/// Persistable view of the workflow, without credentials or in-flight state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub context: ContextMap,
    #[serde(default)]
    pub metadata: MetadataSet,
    #[serde(default)]
    pub publish_log: Vec<LogLine>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// The wizard state machine. Owns stage, busy slot and all per-batch data.
#[derive(Debug)]
pub struct Workflow {
    credentials: CredentialStore,
    stage: Stage,
    session: Option<Session>,
    context: ContextMap,
    metadata: MetadataSet,
    publish_log: Vec<LogLine>,
    last_error: Option<String>,
    in_flight: Option<InFlight>,
    generation: u64,
}

impl Workflow {
    pub fn new(credentials: CredentialStore) -> Self {
        Self::restore(credentials, WorkflowSnapshot::default())
    }

    /// Rebuild a workflow from a snapshot.
    ///
    /// A snapshot past the Upload stage without a session cannot be resumed
    /// and falls back to Upload.
    pub fn restore(credentials: CredentialStore, snapshot: WorkflowSnapshot) -> Self {
        let mut stage = snapshot.stage;
        if stage != Stage::Upload && snapshot.session.is_none() {
            tracing::warn!(%stage, "snapshot has no session; resuming at upload");
            stage = Stage::Upload;
        }
        Self {
            credentials,
            stage,
            session: snapshot.session,
            context: snapshot.context,
            metadata: snapshot.metadata,
            publish_log: snapshot.publish_log,
            last_error: snapshot.last_error,
            in_flight: None,
            generation: 0,
        }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            stage: self.stage,
            session: self.session.clone(),
            context: self.context.clone(),
            metadata: self.metadata.clone(),
            publish_log: self.publish_log.clone(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    pub fn metadata(&self) -> &MetadataSet {
        &self.metadata
    }

    pub fn publish_log(&self) -> &[LogLine] {
        &self.publish_log
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn credentials(&self) -> &Credentials {
        self.credentials.credentials()
    }

    /// Persist new credentials through the store this workflow was built with.
    pub fn save_credentials(&mut self, credentials: Credentials) -> anyhow::Result<()> {
        self.credentials.save(credentials)
    }

    pub fn busy(&self) -> Option<BusyKind> {
        self.in_flight.map(|flight| flight.kind)
    }

    pub fn is_uploading(&self) -> bool {
        self.busy() == Some(BusyKind::Uploading)
    }

    pub fn is_analyzing(&self) -> bool {
        self.busy() == Some(BusyKind::Analyzing)
    }

    pub fn is_publishing(&self) -> bool {
        self.busy() == Some(BusyKind::Publishing)
    }

    // ------------------------------------------------------------------
    // Editors
    // ------------------------------------------------------------------

    /// Set the context hint for one uploaded file. Only valid on the Context stage.
    pub fn set_context(
        &mut self,
        filename: &str,
        hint: impl Into<String>,
    ) -> Result<(), EditError> {
        let session = self.session.as_ref().ok_or(EditError::NoSession)?;
        if self.stage != Stage::Context {
            return Err(EditError::WrongStage(self.stage));
        }
        if !session.contains(filename) {
            return Err(EditError::UnknownFile(filename.to_string()));
        }
        self.context.set(filename, hint);
        Ok(())
    }

    /// Replace one field of the metadata record at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= self.metadata().len()`.
    pub fn set_metadata_field(
        &mut self,
        index: usize,
        field: MetadataField,
        value: impl Into<String>,
    ) {
        self.metadata.set_field(index, field, value.into());
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Review -> Publish. Returns false when not on the Review stage.
    pub fn advance_to_publish_view(&mut self) -> bool {
        if self.stage != Stage::Review {
            return false;
        }
        self.stage = Stage::Publish;
        true
    }

    /// Context -> Upload or Review -> Context. Any in-flight call goes stale.
    pub fn back(&mut self) -> Option<Stage> {
        let target = self.stage.back_target()?;
        self.invalidate_in_flight();
        self.stage = target;
        Some(target)
    }

    /// Start a new batch. Context hints and credentials are kept.
    pub fn reset(&mut self) {
        self.invalidate_in_flight();
        self.stage = Stage::Upload;
        self.session = None;
        self.metadata.clear();
        self.publish_log.clear();
    }

    fn invalidate_in_flight(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            tracing::info!(kind = %flight.kind, "in-flight call abandoned");
        }
        self.generation += 1;
    }

    // ------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------

    pub fn begin_upload(
        &mut self,
        files: Vec<UploadFile>,
    ) -> Result<Pending<Vec<UploadFile>>, Refusal> {
        self.ensure_idle()?;
        self.ensure_stage(Stage::Upload)?;
        if files.is_empty() {
            return Err(Refusal::EmptyBatch);
        }
        Ok(self.claim(BusyKind::Uploading, files))
    }

    pub fn finish_upload(
        &mut self,
        pending: Pending<Vec<UploadFile>>,
        result: Result<UploadResponse, ServiceError>,
    ) -> Completion {
        if !self.release(pending.ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(response) => {
                tracing::info!(
                    session_id = %response.session_id,
                    files = response.files.len(),
                    "upload complete"
                );
                self.session = Some(Session::new(response.session_id, response.files));
                self.metadata.clear();
                self.publish_log.clear();
                self.stage = Stage::Context;
                Completion::Advanced(Stage::Context)
            }
            Err(err) => self.fail(WorkflowError::UploadFailed(err.to_string())),
        }
    }

    pub fn submit_upload<S>(
        &mut self,
        service: &S,
        files: Vec<UploadFile>,
    ) -> Result<Completion, Refusal>
    where
        S: PipelineService + ?Sized,
    {
        let pending = self.begin_upload(files)?;
        let result = service.upload(pending.request());
        Ok(self.finish_upload(pending, result))
    }

    // ------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------

    pub fn begin_analysis(&mut self) -> Result<Pending<AnalyzeRequest>, Refusal> {
        self.ensure_idle()?;
        self.ensure_stage(Stage::Context)?;
        let session_id = self.session_id()?;
        let api_key = self
            .credentials()
            .api_key()
            .ok_or(Refusal::CredentialsMissing(CredentialKind::ApiKey))?
            .to_string();
        let request = AnalyzeRequest {
            session_id,
            api_key,
            context_map: self.context.as_map().clone(),
        };
        Ok(self.claim(BusyKind::Analyzing, request))
    }

    /// Apply an analysis result. Success replaces the metadata set wholesale.
    pub fn finish_analysis(
        &mut self,
        pending: Pending<AnalyzeRequest>,
        result: Result<AnalyzeResponse, ServiceError>,
    ) -> Completion {
        if !self.release(pending.ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(response) => {
                self.warn_on_foreign_records(&response.results);
                tracing::info!(records = response.results.len(), "analysis complete");
                self.metadata = MetadataSet::from_records(response.results);
                self.stage = Stage::Review;
                Completion::Advanced(Stage::Review)
            }
            Err(err) => self.fail(WorkflowError::AnalysisFailed(err.to_string())),
        }
    }

    pub fn request_analysis<S>(&mut self, service: &S) -> Result<Completion, Refusal>
    where
        S: PipelineService + ?Sized,
    {
        let pending = self.begin_analysis()?;
        let result = service.analyze(pending.request());
        Ok(self.finish_analysis(pending, result))
    }

    fn warn_on_foreign_records(&self, records: &[MetadataRecord]) {
        let Some(session) = &self.session else {
            return;
        };
        for record in records.iter().filter(|r| !session.contains(&r.filename)) {
            tracing::warn!(
                filename = %record.filename,
                session_id = %session.id(),
                "analysis returned a record for a file outside the session"
            );
        }
    }

    // ------------------------------------------------------------------
    // Publish
    // ------------------------------------------------------------------

    /// Start a publish. The log is reset to a single initiating line.
    pub fn begin_publish(
        &mut self,
        project_name: &str,
    ) -> Result<Pending<PublishRequest>, Refusal> {
        self.ensure_idle()?;
        self.ensure_stage(Stage::Publish)?;
        let session_id = self.session_id()?;
        let (user, pass) = self
            .credentials()
            .transfer_auth()
            .ok_or(Refusal::CredentialsMissing(CredentialKind::TransferAuth))?;
        let request = PublishRequest {
            session_id,
            project_name: project_name.to_string(),
            metadata: self.metadata.records().to_vec(),
            transfer_user: user.to_string(),
            transfer_pass: pass.to_string(),
        };
        self.publish_log = vec![LogLine::info(INITIATING_MESSAGE)];
        Ok(self.claim(BusyKind::Publishing, request))
    }

    /// Apply a publish result.
    ///
    /// A completed response replaces the log with the aggregated outcome and a
    /// structured failure replaces it with one error line; neither touches
    /// `last_error`. A transport failure sets `last_error` and appends a
    /// critical line to the existing log.
    pub fn finish_publish(
        &mut self,
        pending: Pending<PublishRequest>,
        result: Result<PublishResponse, ServiceError>,
    ) -> Completion {
        if !self.release(pending.ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(PublishResponse::Completed {
                uploaded,
                upload_errors,
                embed_errors,
            }) => {
                tracing::info!(
                    uploaded = uploaded.len(),
                    upload_errors = upload_errors.len(),
                    embed_errors = embed_errors.len(),
                    "publish complete"
                );
                self.publish_log = aggregate(&uploaded, &upload_errors, &embed_errors);
                Completion::Published
            }
            Ok(PublishResponse::Failed { status, error }) => {
                tracing::warn!(%status, %error, "publish rejected");
                self.publish_log = vec![LogLine::new(LogTag::Error, error.clone())];
                Completion::Failed(WorkflowError::PublishRejected(error))
            }
            Err(err) => {
                let message = err.to_string();
                self.publish_log
                    .push(LogLine::new(LogTag::Critical, message.clone()));
                self.fail(WorkflowError::PublishTransportFailure(message))
            }
        }
    }

    pub fn publish<S>(&mut self, service: &S, project_name: &str) -> Result<Completion, Refusal>
    where
        S: PipelineService + ?Sized,
    {
        let pending = self.begin_publish(project_name)?;
        let result = service.embed_and_upload(pending.request());
        Ok(self.finish_publish(pending, result))
    }

    // ------------------------------------------------------------------
    // Guards and busy slot
    // ------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), Refusal> {
        match self.in_flight {
            Some(flight) => {
                tracing::debug!(kind = %flight.kind, "refusing re-entrant call");
                Err(Refusal::Busy(flight.kind))
            }
            None => Ok(()),
        }
    }

    fn ensure_stage(&self, expected: Stage) -> Result<(), Refusal> {
        if self.stage != expected {
            return Err(Refusal::WrongStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn session_id(&self) -> Result<String, Refusal> {
        self.session
            .as_ref()
            .map(|session| session.id().to_string())
            .ok_or(Refusal::NoSession)
    }

    fn claim<R>(&mut self, kind: BusyKind, request: R) -> Pending<R> {
        let ticket = InFlight {
            kind,
            generation: self.generation,
        };
        self.last_error = None;
        self.in_flight = Some(ticket);
        Pending { request, ticket }
    }

    /// Free the busy slot if `ticket` still owns it.
    fn release(&mut self, ticket: InFlight) -> bool {
        if self.in_flight != Some(ticket) {
            tracing::info!(
                kind = %ticket.kind,
                generation = ticket.generation,
                current_generation = self.generation,
                "discarding stale response"
            );
            return false;
        }
        self.in_flight = None;
        true
    }

    fn fail(&mut self, error: WorkflowError) -> Completion {
        tracing::warn!(%error, stage = %self.stage, "remote call failed");
        self.last_error = Some(error.to_string());
        Completion::Failed(error)
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
