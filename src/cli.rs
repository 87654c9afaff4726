//! CLI argument parsing for the batch submission wizard.
use clap::{Args, Parser, Subcommand};
use shutterstacker::service::DEFAULT_SERVER_URL;
use shutterstacker::workflow::{MetadataField, DEFAULT_PROJECT_NAME};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "stacker",
    version,
    about = "Upload, annotate, AI-tag, and publish stock photo batches",
    after_help = "Commands:\n  upload <FILES>...            Send images to the pipeline (stage 1)\n  context <FILE> <HINT>        Attach a context hint to one file (stage 2)\n  analyze                      Generate metadata for the batch (stage 2 -> 3)\n  edit <INDEX> <FIELD> <VALUE> Adjust one generated field (stage 3)\n  proceed                      Move from review to publish (stage 3 -> 4)\n  publish                      Embed metadata and transfer (stage 4)\n\nExamples:\n  stacker credentials set --api-key KEY --transfer-user me --transfer-pass secret\n  stacker upload shots/*.jpg\n  stacker context IMG_001.jpg \"Eiffel Tower at dusk\"\n  stacker analyze\n  stacker edit 0 title \"Paris skyline\"\n  stacker proceed && stacker publish\n  stacker run shots/*.jpg --context IMG_001.jpg=\"Eiffel Tower\"",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Pipeline backend base URL
    #[arg(
        long,
        global = true,
        env = "STACKER_SERVER",
        value_name = "URL",
        default_value = DEFAULT_SERVER_URL
    )]
    pub server: String,

    /// Directory holding the workflow snapshot and publish history
    #[arg(long, global = true, env = "STACKER_WORKSPACE", value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Credentials file (JSON with gemini_key, ftp_user, ftp_pass)
    #[arg(long, global = true, env = "STACKER_CREDENTIALS", value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Timeout for each remote call, in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Log remote calls and state transitions to stderr
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Top-level wizard commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Credentials(CredentialsArgs),
    Upload(UploadArgs),
    Context(ContextArgs),
    /// Generate metadata for every uploaded file
    Analyze,
    Edit(EditArgs),
    /// Move from review to the publish stage
    Proceed,
    /// Return to the previous stage (context -> upload, review -> context)
    Back,
    Publish(PublishArgs),
    /// Start a new batch; context hints and credentials are kept
    Reset,
    Status(StatusArgs),
    Preview(PreviewArgs),
    History(HistoryArgs),
    Run(RunArgs),
}

#[derive(Args, Debug)]
#[command(about = "Show or update stored credentials")]
pub struct CredentialsArgs {
    #[command(subcommand)]
    pub action: CredentialsAction,
}

#[derive(Subcommand, Debug)]
pub enum CredentialsAction {
    /// Save credentials; omitted values keep their stored value
    Set(CredentialsSetArgs),
    /// Print stored credentials with secrets masked
    Show,
}

#[derive(Args, Debug)]
pub struct CredentialsSetArgs {
    /// Analysis provider API key
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Stock host transfer username
    #[arg(long, value_name = "USER")]
    pub transfer_user: Option<String>,

    /// Stock host transfer password
    #[arg(long, value_name = "PASS")]
    pub transfer_pass: Option<String>,
}

#[derive(Args, Debug)]
#[command(about = "Upload a batch of images and open a session")]
pub struct UploadArgs {
    /// Image files to upload
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
#[command(about = "Set the context hint for one uploaded file")]
pub struct ContextArgs {
    /// File name as reported by the upload
    pub filename: String,

    /// Free-text hint passed to the analysis (empty clears it)
    pub hint: String,
}

#[derive(Args, Debug)]
#[command(about = "Edit one field of a generated metadata record")]
pub struct EditArgs {
    /// Zero-based record index as listed by `status`
    pub index: usize,

    /// One of: title, category, description, keywords
    pub field: MetadataField,

    /// New value for the field
    pub value: String,
}

#[derive(Args, Debug)]
#[command(about = "Embed metadata and transfer the batch to the stock host")]
pub struct PublishArgs {
    /// Batch label sent with the publish request
    #[arg(long, value_name = "NAME", default_value = DEFAULT_PROJECT_NAME)]
    pub project_name: String,
}

#[derive(Args, Debug)]
#[command(about = "Summarize the current stage and batch")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(about = "Print the preview URL for an uploaded file")]
pub struct PreviewArgs {
    pub filename: String,
}

#[derive(Args, Debug)]
#[command(about = "List past publishes recorded in this workspace")]
pub struct HistoryArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(about = "Upload, annotate, analyze, and publish in one pass")]
pub struct RunArgs {
    /// Image files to upload
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Context hint for one file, as FILE=HINT (repeatable)
    #[arg(long = "context", value_name = "FILE=HINT", value_parser = parse_context_pair)]
    pub context: Vec<(String, String)>,

    /// Batch label sent with the publish request
    #[arg(long, value_name = "NAME", default_value = DEFAULT_PROJECT_NAME)]
    pub project_name: String,
}

fn parse_context_pair(raw: &str) -> Result<(String, String), String> {
    let (file, hint) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FILE=HINT, got {raw:?}"))?;
    let file = file.trim();
    if file.is_empty() {
        return Err(format!("missing file name in {raw:?}"));
    }
    Ok((file.to_string(), hint.to_string()))
}
