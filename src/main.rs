mod cli;
mod config;
mod engine;
mod error;
mod logging;
mod model;
mod orchestrator;
mod presenter;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = !args.is_interactive();

    let succeeded = cli::run(args).await?;
    // Scripted runs report the submission outcome through the exit code.
    if is_non_tui {
        std::process::exit(if succeeded { 0 } else { 1 });
    }
    Ok(())
}
