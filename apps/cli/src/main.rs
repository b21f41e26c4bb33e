//! BrochureKit CLI: turn a company website into brochure-ready page text.
//!
//! Runs the three pipeline stages (discover, curate, extract) one at a time
//! or back to back, leaving JSON artifacts in the output directory.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
