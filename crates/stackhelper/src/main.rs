use anyhow::{Context, Result};
use clap::Parser;
use stackhelper::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = stackhelper::init(&cli.global)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(stackhelper::commands::run(cli.command, &config))
}
