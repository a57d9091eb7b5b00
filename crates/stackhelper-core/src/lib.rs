// stackhelper-core - CloudFormation deployment helpers
//
// - parameters: ordered stack parameters with ${token} substitution
// - orchestrator: stack lifecycle actions through the aws CLI
// - exports: application-scoped CloudFormation exports
// - publisher: sequential puts into the SSM Parameter Store

pub mod error;
pub mod exports;
pub mod orchestrator;
pub mod parameters;
pub mod publisher;

pub use error::{ExportError, ParameterError, PublishError, StackError};
pub use exports::{ExportMap, ExportReader, ExportRecord, ExportSource};
pub use orchestrator::{
    ActionOutcome, AwsCli, ChangeSetExecution, CliCommand, CommandRunner, ProcessRunner,
    StackAction, StackDescriptor, StackOptions, StackOrchestrator, StackOutcome,
};
pub use parameters::{Parameter, ParameterOptions, ParameterSet};
pub use publisher::{
    ParameterStore, ParameterType, PublishReport, PublishResult, Publisher, PutOutcome,
    PutRequest, RemoteParameter,
};
