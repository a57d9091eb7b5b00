use crate::cli::StackArgs;
use anyhow::{bail, Context, Result};
use stackhelper_config::RuntimeConfig;
use stackhelper_core::{
    ActionOutcome, AwsCli, ChangeSetExecution, StackDescriptor, StackOptions, StackOrchestrator,
    StackOutcome,
};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

pub(super) async fn run(args: StackArgs, config: &RuntimeConfig) -> Result<()> {
    let action = args.stack_action();
    let parameters = args.parameters.load()?;

    let descriptor = StackDescriptor {
        stack_name: args.stack_name,
        template_path: args.template,
        parameters,
        options: stack_options(config, args.wait),
    };
    let stack_name = descriptor.stack_name.clone();
    let orchestrator = StackOrchestrator::new(descriptor);

    let outcome = orchestrator
        .run(action)
        .await
        .with_context(|| format!("{} failed for stack {}", action, stack_name))?;

    match outcome {
        ActionOutcome::Completed | ActionOutcome::Stack(StackOutcome::Applied) => {
            info!(action = %action, stack = %stack_name, "Done");
        }
        ActionOutcome::Stack(StackOutcome::NoChangesDetected) => {
            info!(action = %action, stack = %stack_name, "Stack already up to date");
        }
        ActionOutcome::Stack(StackOutcome::Failed(reason)) => {
            bail!("{} failed for stack {}: {}", action, stack_name, reason);
        }
        ActionOutcome::ChangeSetCreated(name) => {
            info!(change_set = %name, stack = %stack_name, "Change set created");
        }
        ActionOutcome::ChangeSet(ChangeSetExecution::Executed) => {
            info!(stack = %stack_name, "Change set executed");
        }
        ActionOutcome::ChangeSet(ChangeSetExecution::Skipped { reason }) => {
            warn!(stack = %stack_name, reason = %reason, "Change set not executed");
        }
    }
    Ok(())
}

/// Orchestrator options from configuration; `--wait` only ever turns waiting on
pub fn stack_options(config: &RuntimeConfig, wait: bool) -> StackOptions {
    StackOptions {
        wait: wait || config.stack.wait,
        log_level: config.log.level.parse().unwrap_or(LevelFilter::INFO),
        capabilities: config.stack.capabilities.clone(),
        cli: AwsCli {
            program: config.aws.cli_path.clone(),
            region: Some(config.aws.region.clone()),
            endpoint_url: config.aws.endpoint_url.clone(),
        },
    }
}
