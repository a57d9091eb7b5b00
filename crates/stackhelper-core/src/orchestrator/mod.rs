//! CloudFormation stack lifecycle through the `aws` CLI
//!
//! Every action turns into one or more `aws cloudformation ...` invocations
//! that run strictly one after another. Nothing about the stack is cached: the
//! change set name and every command are rebuilt on each call.

mod action;
mod command;

pub use action::StackAction;
pub use command::{CliCommand, CommandRunner, ProcessRunner};

use crate::error::StackError;
use crate::parameters::ParameterSet;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn, Level};

/// CLI failure text that means the stack already matches the template
const NO_CHANGE_MARKERS: &[&str] = &["No updates are to be performed", "No changes to deploy"];

/// Where and how the `aws` CLI is invoked
#[derive(Debug, Clone)]
pub struct AwsCli {
    pub program: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            region: None,
            endpoint_url: None,
        }
    }
}

impl AwsCli {
    /// `aws [--region R] [--endpoint-url U] cloudformation <subcommand>`
    pub fn cloudformation(&self, subcommand: &str) -> CliCommand {
        let mut command = CliCommand::new(&self.program);
        if let Some(region) = &self.region {
            command = command.flag("--region", region.as_str());
        }
        if let Some(endpoint) = &self.endpoint_url {
            command = command.flag("--endpoint-url", endpoint.as_str());
        }
        command.arg("cloudformation").arg(subcommand)
    }
}

#[derive(Debug, Clone)]
pub struct StackOptions {
    /// Block on the matching `wait` call after each mutation
    pub wait: bool,
    /// Commands are echoed when this filter admits INFO
    pub log_level: LevelFilter,
    pub capabilities: Vec<String>,
    pub cli: AwsCli,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            wait: false,
            log_level: LevelFilter::INFO,
            capabilities: vec![
                "CAPABILITY_NAMED_IAM".to_string(),
                "CAPABILITY_AUTO_EXPAND".to_string(),
            ],
            cli: AwsCli::default(),
        }
    }
}

/// Everything needed to act on one stack
#[derive(Debug, Clone)]
pub struct StackDescriptor {
    pub stack_name: String,
    pub template_path: PathBuf,
    pub parameters: ParameterSet,
    pub options: StackOptions,
}

impl StackDescriptor {
    /// One change set per stack; a new one replaces the previous identity
    pub fn change_set_name(&self) -> String {
        format!("{}-latest", self.stack_name)
    }

    fn template_body(&self) -> String {
        format!("file://{}", self.template_path.display())
    }
}

/// Result of an update or deploy, which never raises
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOutcome {
    Applied,
    NoChangesDetected,
    Failed(String),
}

impl StackOutcome {
    fn classify(result: Result<(), StackError>) -> Self {
        match result {
            Ok(()) => StackOutcome::Applied,
            Err(err) => {
                let text = err.output().unwrap_or_default();
                if NO_CHANGE_MARKERS.iter().any(|m| text.contains(m)) {
                    StackOutcome::NoChangesDetected
                } else {
                    StackOutcome::Failed(err.to_string())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetExecution {
    Executed,
    /// The change set reported FAILED, so nothing was executed
    Skipped { reason: String },
}

/// What a dispatched action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Stack(StackOutcome),
    ChangeSetCreated(String),
    ChangeSet(ChangeSetExecution),
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Stack(StackOutcome::Failed(_)))
    }
}

#[derive(Debug, Deserialize)]
struct ChangeSetDescription {
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "StatusReason", default)]
    status_reason: Option<String>,
}

pub struct StackOrchestrator<R = ProcessRunner> {
    descriptor: StackDescriptor,
    runner: R,
}

impl StackOrchestrator<ProcessRunner> {
    pub fn new(descriptor: StackDescriptor) -> Self {
        Self::with_runner(descriptor, ProcessRunner)
    }
}

impl<R: CommandRunner> StackOrchestrator<R> {
    pub fn with_runner(descriptor: StackDescriptor, runner: R) -> Self {
        Self { descriptor, runner }
    }

    pub fn descriptor(&self) -> &StackDescriptor {
        &self.descriptor
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Dispatch one action
    pub async fn run(&self, action: StackAction) -> Result<ActionOutcome, StackError> {
        info!(action = %action, stack = %self.descriptor.stack_name, "Running stack action");

        match action {
            StackAction::Delete => self.delete().await.map(|_| ActionOutcome::Completed),
            StackAction::Recreate => self.recreate().await.map(|_| ActionOutcome::Completed),
            StackAction::Create => self.create().await.map(|_| ActionOutcome::Completed),
            StackAction::Update => Ok(ActionOutcome::Stack(self.update().await)),
            StackAction::Deploy => Ok(ActionOutcome::Stack(self.deploy().await)),
            StackAction::CreateChangeSet { generate_only } => self
                .create_change_set(generate_only)
                .await
                .map(ActionOutcome::ChangeSetCreated),
            StackAction::ExecuteChangeSet => {
                self.execute_change_set().await.map(ActionOutcome::ChangeSet)
            }
        }
    }

    pub async fn delete(&self) -> Result<(), StackError> {
        let command = self
            .cfn("delete-stack")
            .flag("--stack-name", &self.descriptor.stack_name)
            .flag("--client-request-token", &request_token());
        self.cli(&command).await?;

        if self.descriptor.options.wait {
            self.wait_for("stack-delete-complete").await?;
        }
        Ok(())
    }

    pub async fn recreate(&self) -> Result<(), StackError> {
        self.delete().await?;
        self.create().await
    }

    pub async fn create(&self) -> Result<(), StackError> {
        self.cli(&self.stack_command("create-stack")).await?;

        if self.descriptor.options.wait {
            self.wait_for("stack-create-complete").await?;
        }
        Ok(())
    }

    /// Update the stack; failures are classified and logged, never raised
    pub async fn update(&self) -> StackOutcome {
        let result = async {
            self.cli(&self.stack_command("update-stack")).await?;
            if self.descriptor.options.wait {
                self.wait_for("stack-update-complete").await?;
            }
            Ok::<(), StackError>(())
        }
        .await;

        self.report(StackOutcome::classify(result))
    }

    /// `aws cloudformation deploy`, which waits on its own
    pub async fn deploy(&self) -> StackOutcome {
        let mut command = self
            .cfn("deploy")
            .arg("--capabilities")
            .args(self.descriptor.options.capabilities.iter().cloned())
            .flag("--stack-name", &self.descriptor.stack_name)
            .flag(
                "--template-file",
                self.descriptor.template_path.display().to_string(),
            );

        let overrides = self.descriptor.parameters.override_pairs();
        if !overrides.is_empty() {
            command = command.arg("--parameter-overrides").args(overrides);
        }

        let result = self.cli(&command).await;
        self.report(StackOutcome::classify(result))
    }

    /// Create (or with `generate_only`, describe the request for) `{stack}-latest`
    pub async fn create_change_set(&self, generate_only: bool) -> Result<String, StackError> {
        let change_set = self.descriptor.change_set_name();

        let mut command = self
            .stack_base("create-change-set")
            .flag("--change-set-name", &change_set);
        if generate_only {
            command = command.args(["--generate-cli-skeleton", "output"]);
        }
        self.cli(&command).await?;

        if !generate_only {
            let execute = self
                .cfn("execute-change-set")
                .flag("--change-set-name", &change_set)
                .flag("--stack-name", &self.descriptor.stack_name);
            info!("You can now run: {}", execute);

            if self.descriptor.options.wait {
                self.wait_for_change_set(&change_set).await?;
            }
        }

        Ok(change_set)
    }

    /// Execute `{stack}-latest` unless its description reports FAILED
    pub async fn execute_change_set(&self) -> Result<ChangeSetExecution, StackError> {
        let change_set = self.descriptor.change_set_name();

        let describe = self
            .cfn("describe-change-set")
            .flag("--stack-name", &self.descriptor.stack_name)
            .flag("--change-set-name", &change_set)
            .args(["--output", "json"]);
        self.echo(&describe);
        let stdout = self.runner.output(&describe).await?;
        let description: ChangeSetDescription = serde_json::from_str(&stdout)?;

        if description.status.as_deref() == Some("FAILED") {
            let reason = description.status_reason.unwrap_or_default();
            info!(change_set = %change_set, reason = %reason, "Change set failed, skipping execution");
            return Ok(ChangeSetExecution::Skipped { reason });
        }

        let execute = self
            .cfn("execute-change-set")
            .flag("--change-set-name", &change_set)
            .flag("--stack-name", &self.descriptor.stack_name)
            .flag("--client-request-token", &request_token());
        self.cli(&execute).await?;

        Ok(ChangeSetExecution::Executed)
    }

    async fn wait_for(&self, condition: &str) -> Result<(), StackError> {
        let command = self
            .cfn("wait")
            .arg(condition)
            .flag("--stack-name", &self.descriptor.stack_name);
        self.cli(&command).await
    }

    async fn wait_for_change_set(&self, change_set: &str) -> Result<(), StackError> {
        let command = self
            .cfn("wait")
            .arg("change-set-create-complete")
            .flag("--change-set-name", change_set)
            .flag("--stack-name", &self.descriptor.stack_name);
        self.cli(&command).await
    }

    /// create-stack / update-stack with a client request token
    fn stack_command(&self, subcommand: &str) -> CliCommand {
        self.stack_base(subcommand)
            .flag("--client-request-token", &request_token())
    }

    fn stack_base(&self, subcommand: &str) -> CliCommand {
        self.cfn(subcommand)
            .arg("--capabilities")
            .args(self.descriptor.options.capabilities.iter().cloned())
            .flag("--stack-name", &self.descriptor.stack_name)
            .flag("--template-body", &self.descriptor.template_body())
            .flag("--parameters", &self.descriptor.parameters.to_json())
    }

    fn cfn(&self, subcommand: &str) -> CliCommand {
        self.descriptor.options.cli.cloudformation(subcommand)
    }

    async fn cli(&self, command: &CliCommand) -> Result<(), StackError> {
        self.echo(command);
        self.runner.run(command).await
    }

    fn echo(&self, command: &CliCommand) {
        if Level::INFO <= self.descriptor.options.log_level {
            info!("{}", command);
        }
    }

    fn report(&self, outcome: StackOutcome) -> StackOutcome {
        match &outcome {
            StackOutcome::Applied => info!(stack = %self.descriptor.stack_name, "Stack changes applied"),
            StackOutcome::NoChangesDetected => {
                info!(stack = %self.descriptor.stack_name, "No changes to apply")
            }
            StackOutcome::Failed(reason) => {
                warn!(stack = %self.descriptor.stack_name, reason = %reason, "Stack operation failed")
            }
        }
        outcome
    }
}

/// Millisecond epoch, unique enough per invocation for CloudFormation idempotency
fn request_token() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_with(output: &str) -> StackError {
        StackError::CommandFailed {
            command: "aws cloudformation update-stack".to_string(),
            status: "exit status: 255".to_string(),
            output: output.to_string(),
        }
    }

    #[test]
    fn classify_distinguishes_no_op_from_failure() {
        assert_eq!(StackOutcome::classify(Ok(())), StackOutcome::Applied);
        assert_eq!(
            StackOutcome::classify(Err(error_with(
                "An error occurred (ValidationError) when calling the UpdateStack operation: No updates are to be performed."
            ))),
            StackOutcome::NoChangesDetected
        );
        assert_eq!(
            StackOutcome::classify(Err(error_with(
                "No changes to deploy. Stack web is up to date"
            ))),
            StackOutcome::NoChangesDetected
        );
        assert!(matches!(
            StackOutcome::classify(Err(error_with("AccessDenied"))),
            StackOutcome::Failed(reason) if reason.contains("AccessDenied")
        ));
    }

    #[test]
    fn aws_cli_places_global_options_first() {
        let cli = AwsCli {
            program: "aws".to_string(),
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("http://localhost:4566".to_string()),
        };
        assert_eq!(
            cli.cloudformation("list-exports").to_string(),
            "aws --region eu-west-1 --endpoint-url http://localhost:4566 cloudformation list-exports"
        );
    }

    #[test]
    fn request_token_is_epoch_millis() {
        let token: i64 = request_token().parse().unwrap();
        assert!(token > 1_600_000_000_000);
    }

    #[test]
    fn only_failed_stack_outcome_is_failure() {
        assert!(ActionOutcome::Stack(StackOutcome::Failed("x".into())).is_failure());
        assert!(!ActionOutcome::Stack(StackOutcome::NoChangesDetected).is_failure());
        assert!(!ActionOutcome::Completed.is_failure());
    }
}
