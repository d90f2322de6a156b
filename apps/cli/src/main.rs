//! SIL Inspector CLI: see what the Swift compiler makes of a snippet.
//!
//! Serves the inspector web API, or runs the same compile pipeline
//! locally and prints every stage.

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
