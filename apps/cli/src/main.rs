//! blockpress CLI: build typed page data from a block-graph content source.
//!
//! Resolves a site config, extracts every collection into pages and routes,
//! and optionally relocates images to local storage.

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
