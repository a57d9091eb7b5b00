//! Subcommand implementations

mod exports;
mod params;
mod publish;
mod stack;

pub use exports::run as run_exports;
pub use params::render as render_params;
pub use stack::stack_options;

use crate::cli::Command;
use anyhow::Result;
use stackhelper_config::RuntimeConfig;

/// Dispatch a parsed subcommand with resolved configuration
pub async fn run(command: Command, config: &RuntimeConfig) -> Result<()> {
    match command {
        Command::Stack(args) => stack::run(args, config).await,
        Command::Publish(args) => publish::run(args, config).await,
        Command::Exports(args) => exports::run(args, config).await,
        Command::Params(args) => params::run(args),
    }
}
