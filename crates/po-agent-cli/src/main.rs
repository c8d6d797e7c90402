//! `po-agent`: parse agent CLI event streams, run agents, and score the
//! translation reviews they produce.

mod cli;
mod commands;
mod observability;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_observability();
    let cli = Cli::parse();
    commands::dispatch(cli.command).await
}
