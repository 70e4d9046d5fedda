//! docbinder CLI: compile an Outline collection into one HTML file.
//!
//! Walks the collection's document tree, fetches every published document,
//! and writes a single self-contained page with a table of contents.

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
