// retail-dwh/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing) on stderr, so stdout stays the user-facing report.
    // RUST_LOG=debug retail-dwh run ... for the details
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { mode, project } => commands::run::execute(project, mode.into()).await,
        Commands::Provision { project } => commands::provision::execute(project).await,
        Commands::Batches { project, limit } => commands::batches::execute(project, limit).await,
        Commands::Quality { project, batch_id } => {
            commands::quality::execute(project, batch_id).await
        }
        Commands::Clean { project } => commands::clean::execute(project),
    }
}
