//! contribscout CLI — GitHub contributor discovery and outreach lists.
//!
//! Crawls contributor data across a set of repositories, filters by
//! activity thresholds, enriches contact data, and exports a deduplicated
//! spreadsheet.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
