use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Command, CredentialsArgs, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.global.verbose);

    let global = &args.global;
    match args.command {
        Command::Credentials(CredentialsArgs { action }) => {
            commands::run_credentials(global, action)
        }
        Command::Upload(upload) => commands::run_upload(global, upload),
        Command::Context(context) => commands::run_context(global, context),
        Command::Analyze => commands::run_analyze(global),
        Command::Edit(edit) => commands::run_edit(global, edit),
        Command::Proceed => commands::run_proceed(global),
        Command::Back => commands::run_back(global),
        Command::Publish(publish) => commands::run_publish(global, publish),
        Command::Reset => commands::run_reset(global),
        Command::Status(status) => commands::run_status(global, status),
        Command::Preview(preview) => commands::run_preview(global, preview),
        Command::History(history) => commands::run_history(global, history),
        Command::Run(run) => commands::run_run(global, run),
    }
}

/// Log to stderr. `RUST_LOG` overrides the `--verbose` default.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
