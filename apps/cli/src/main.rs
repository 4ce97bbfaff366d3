//! docrender CLI: render documentation page bundles.
//!
//! Resolves a page bundle's content tree against component overrides and
//! writes the assembled page as a JSON tree, HTML or Markdown.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
