//! Command handlers for the `stacker` binary.
//!
//! Each invocation loads the workflow snapshot, applies one operation, and
//! writes the snapshot back. Remote calls block until the pipeline answers.
use crate::cli::{
    ContextArgs, CredentialsAction, CredentialsSetArgs, EditArgs, GlobalArgs, HistoryArgs,
    PreviewArgs, PublishArgs, RunArgs, StatusArgs, UploadArgs,
};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use shutterstacker::credentials::{default_credentials_path, mask, CredentialStore, Credentials};
use shutterstacker::service::{HttpPipeline, UploadFile};
use shutterstacker::workflow::{
    Completion, CredentialKind, LogLine, MetadataField, Refusal, Stage, Workflow, WorkflowError,
    WorkflowSnapshot,
};
use shutterstacker::workspace::{
    append_history, default_workspace_root, load_snapshot, now_epoch_ms, read_history,
    write_snapshot, PublishHistoryEntry, WorkspacePaths,
};
use std::path::PathBuf;
use std::time::Duration;

/// Loaded workflow plus everything needed to drive and persist it.
struct App {
    paths: WorkspacePaths,
    workflow: Workflow,
    pipeline: HttpPipeline,
}

impl App {
    fn load(global: &GlobalArgs) -> Result<Self> {
        let store = load_store(global)?;
        let paths = workspace_paths(global)?;
        let snapshot = load_snapshot(&paths)?;
        tracing::info!(
            workspace = %paths.root().display(),
            stage = %snapshot.stage,
            "workflow loaded"
        );
        Ok(Self {
            paths,
            workflow: Workflow::restore(store, snapshot),
            pipeline: HttpPipeline::new(&global.server, Duration::from_secs(global.timeout_secs)),
        })
    }

    fn save(&self) -> Result<()> {
        write_snapshot(&self.paths, &self.workflow.snapshot())
    }

    /// Persist the workflow, then turn a failed completion into an error.
    fn settle(&self, completion: Completion) -> Result<()> {
        self.save()?;
        match completion {
            Completion::Advanced(stage) => {
                print_stage(stage);
                Ok(())
            }
            Completion::Published => Ok(()),
            Completion::Failed(err) => Err(err.into()),
            Completion::Stale => Err(anyhow!("response arrived after the workflow moved on")),
        }
    }

    fn record_publish(&self, project_name: &str, session_id: &str) -> Result<()> {
        let entry = PublishHistoryEntry {
            at_epoch_ms: now_epoch_ms()?,
            session_id: session_id.to_string(),
            project_name: project_name.to_string(),
            lines: self.workflow.publish_log().to_vec(),
        };
        append_history(&self.paths, &entry)
    }
}

fn workspace_paths(global: &GlobalArgs) -> Result<WorkspacePaths> {
    let root = match &global.workspace {
        Some(root) => root.clone(),
        None => default_workspace_root()?,
    };
    Ok(WorkspacePaths::new(root))
}

fn load_store(global: &GlobalArgs) -> Result<CredentialStore> {
    let path = match &global.credentials {
        Some(path) => path.clone(),
        None => default_credentials_path()?,
    };
    CredentialStore::load(path)
}

/// Render a refusal, pointing credential redirects at `credentials set`.
fn refused(refusal: Refusal) -> anyhow::Error {
    let Some(kind) = refusal.missing_credential() else {
        return refusal.into();
    };
    let how = match kind {
        CredentialKind::ApiKey => "stacker credentials set --api-key <KEY>",
        CredentialKind::TransferAuth => {
            "stacker credentials set --transfer-user <USER> --transfer-pass <PASS>"
        }
    };
    anyhow!("{}\nSet it with: {how}", WorkflowError::CredentialsMissing(kind))
}

pub fn run_credentials(global: &GlobalArgs, action: CredentialsAction) -> Result<()> {
    let mut store = load_store(global)?;
    match action {
        CredentialsAction::Set(args) => {
            let updated = merge_credentials(store.credentials(), args);
            store.save(updated)?;
            if let Some(path) = store.path() {
                println!("Credentials saved to {}", path.display());
            }
            print_credentials(store.credentials());
        }
        CredentialsAction::Show => print_credentials(store.credentials()),
    }
    Ok(())
}

fn merge_credentials(current: &Credentials, args: CredentialsSetArgs) -> Credentials {
    Credentials {
        api_key: args.api_key.unwrap_or_else(|| current.api_key.clone()),
        transfer_user: args
            .transfer_user
            .unwrap_or_else(|| current.transfer_user.clone()),
        transfer_pass: args
            .transfer_pass
            .unwrap_or_else(|| current.transfer_pass.clone()),
    }
}

fn print_credentials(credentials: &Credentials) {
    let user = if credentials.transfer_user.is_empty() {
        "<unset>"
    } else {
        credentials.transfer_user.as_str()
    };
    println!("api_key: {}", mask(&credentials.api_key));
    println!("transfer_user: {user}");
    println!("transfer_pass: {}", mask(&credentials.transfer_pass));
}

fn read_files(files: &[PathBuf]) -> Result<Vec<UploadFile>> {
    files.iter().map(|path| UploadFile::read(path)).collect()
}

pub fn run_upload(global: &GlobalArgs, args: UploadArgs) -> Result<()> {
    let mut app = App::load(global)?;
    let files = read_files(&args.files)?;
    let completion = app
        .workflow
        .submit_upload(&app.pipeline, files)
        .map_err(refused)?;
    app.settle(completion)?;
    print_session_files(&app.workflow);
    Ok(())
}

pub fn run_context(global: &GlobalArgs, args: ContextArgs) -> Result<()> {
    let mut app = App::load(global)?;
    app.workflow.set_context(&args.filename, args.hint)?;
    app.save()
}

pub fn run_analyze(global: &GlobalArgs) -> Result<()> {
    let mut app = App::load(global)?;
    let completion = app
        .workflow
        .request_analysis(&app.pipeline)
        .map_err(refused)?;
    app.settle(completion)?;
    print_metadata(&app.workflow);
    Ok(())
}

pub fn run_edit(global: &GlobalArgs, args: EditArgs) -> Result<()> {
    let mut app = App::load(global)?;
    let stage = app.workflow.stage();
    if stage != Stage::Review {
        bail!("metadata can only be edited on the review stage (current stage: {stage})");
    }
    let len = app.workflow.metadata().len();
    if args.index >= len {
        bail!("record index {} out of range ({len} records)", args.index);
    }
    app.workflow
        .set_metadata_field(args.index, args.field, args.value);
    app.save()
}

pub fn run_proceed(global: &GlobalArgs) -> Result<()> {
    let mut app = App::load(global)?;
    if !app.workflow.advance_to_publish_view() {
        bail!(
            "proceed is only available on the review stage (current stage: {})",
            app.workflow.stage()
        );
    }
    app.save()?;
    print_stage(Stage::Publish);
    Ok(())
}

pub fn run_back(global: &GlobalArgs) -> Result<()> {
    let mut app = App::load(global)?;
    let Some(stage) = app.workflow.back() else {
        bail!("cannot go back from the {} stage", app.workflow.stage());
    };
    app.save()?;
    print_stage(stage);
    Ok(())
}

pub fn run_publish(global: &GlobalArgs, args: PublishArgs) -> Result<()> {
    let mut app = App::load(global)?;
    publish(&mut app, &args.project_name)
}

fn publish(app: &mut App, project_name: &str) -> Result<()> {
    let completion = app
        .workflow
        .publish(&app.pipeline, project_name)
        .map_err(refused)?;
    // The remote publish has already run; persist its outcome first.
    app.save()?;
    let log = app.workflow.publish_log();
    for line in log {
        println!("{line}");
    }
    let failed = failure_count(log);
    if failed > 0 {
        println!("{failed} of {} outcome line(s) reported a failure", log.len());
    }
    if !matches!(completion, Completion::Stale) {
        if let Some(session) = app.workflow.session() {
            if let Err(err) = app.record_publish(project_name, session.id()) {
                tracing::warn!(error = %format!("{err:#}"), "publish history not recorded");
            }
        }
    }
    app.settle(completion)
}

fn failure_count(lines: &[LogLine]) -> usize {
    lines.iter().filter(|line| line.tag.is_failure()).count()
}

pub fn run_history(global: &GlobalArgs, args: HistoryArgs) -> Result<()> {
    let entries = read_history(&workspace_paths(global)?)?;
    if args.json {
        let text = serde_json::to_string_pretty(&entries).context("serialize history")?;
        println!("{text}");
        return Ok(());
    }
    if entries.is_empty() {
        println!("No publishes recorded.");
    }
    for entry in &entries {
        println!(
            "{}  {}  session {}  {} line(s), {} failure(s)",
            entry.at_epoch_ms,
            entry.project_name,
            entry.session_id,
            entry.lines.len(),
            failure_count(&entry.lines)
        );
    }
    Ok(())
}

pub fn run_reset(global: &GlobalArgs) -> Result<()> {
    let mut app = App::load(global)?;
    app.workflow.reset();
    app.save()?;
    print_stage(Stage::Upload);
    Ok(())
}

pub fn run_preview(global: &GlobalArgs, args: PreviewArgs) -> Result<()> {
    let app = App::load(global)?;
    let session = app
        .workflow
        .session()
        .ok_or_else(|| anyhow!("no uploaded session"))?;
    if !session.contains(&args.filename) {
        bail!("{:?} is not part of the current session", args.filename);
    }
    println!(
        "{}",
        app.pipeline.preview_url(session, &args.filename)
    );
    Ok(())
}

pub fn run_run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let mut app = App::load(global)?;
    if app.workflow.stage() != Stage::Upload {
        tracing::info!(stage = %app.workflow.stage(), "starting a new batch");
        app.workflow.reset();
    }
    let files = read_files(&args.files)?;
    let completion = app
        .workflow
        .submit_upload(&app.pipeline, files)
        .map_err(refused)?;
    app.settle(completion)?;

    for (filename, hint) in args.context {
        app.workflow
            .set_context(&filename, hint)
            .with_context(|| format!("apply context for {filename}"))?;
    }
    app.save()?;

    let completion = app
        .workflow
        .request_analysis(&app.pipeline)
        .map_err(refused)?;
    app.settle(completion)?;
    print_metadata(&app.workflow);

    if !app.workflow.advance_to_publish_view() {
        bail!("analysis did not reach the review stage");
    }
    app.save()?;
    publish(&mut app, &args.project_name)
}

#[derive(Serialize)]
struct StatusReport<'a> {
    #[serde(flatten)]
    snapshot: &'a WorkflowSnapshot,
    api_key_configured: bool,
    transfer_auth_configured: bool,
}

pub fn run_status(global: &GlobalArgs, args: StatusArgs) -> Result<()> {
    let app = App::load(global)?;
    let workflow = &app.workflow;
    if args.json {
        let snapshot = workflow.snapshot();
        let report = StatusReport {
            snapshot: &snapshot,
            api_key_configured: workflow.credentials().api_key().is_some(),
            transfer_auth_configured: workflow.credentials().transfer_auth().is_some(),
        };
        let text = serde_json::to_string_pretty(&report).context("serialize status")?;
        println!("{text}");
        return Ok(());
    }

    print_stage(workflow.stage());
    match workflow.session() {
        Some(session) => println!("Session: {}", session.id()),
        None => println!("Session: none"),
    }
    print_session_files(workflow);
    if !workflow.metadata().is_empty() {
        print_metadata(workflow);
    }
    if !workflow.publish_log().is_empty() {
        println!("Publish log:");
        for line in workflow.publish_log() {
            println!("  {line}");
        }
    }
    if let Some(error) = workflow.last_error() {
        println!("Last error: {error}");
    }
    Ok(())
}

fn print_stage(stage: Stage) {
    println!("Stage {}/4: {}", stage.number(), stage);
}

fn print_session_files(workflow: &Workflow) {
    let Some(session) = workflow.session() else {
        return;
    };
    println!("Files:");
    for filename in session.filenames() {
        match workflow.context().hint(filename) {
            Some(hint) if !hint.is_empty() => println!("  {filename}  [{hint}]"),
            _ => println!("  {filename}"),
        }
    }
}

fn print_metadata(workflow: &Workflow) {
    println!("Metadata:");
    for (index, record) in workflow.metadata().iter().enumerate() {
        println!("  [{index}] {}", record.filename);
        for field in MetadataField::ALL {
            println!("      {field}: {}", record.field(field));
        }
    }
}
