mod bootstrap_helpers;
mod cli_args;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use propwatch_github_runtime::{SyncError, EXIT_CODE_FAILURE};
use tokio::sync::watch;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::commands::run_cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            let _ = cancel_tx.send(true);
        }
    });

    match run_cli(cli, cancel_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(exit_code_for(&error))
        }
    }
}

fn exit_code_for(error: &anyhow::Error) -> u8 {
    let code = error
        .downcast_ref::<SyncError>()
        .map_or(EXIT_CODE_FAILURE, SyncError::exit_code);
    u8::try_from(code).unwrap_or(1)
}
