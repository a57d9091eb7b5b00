//! Error types for stackhelper-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or filtering a parameter set
#[derive(Debug, Error)]
pub enum ParameterError {
    /// No token map was configured, so placeholders cannot be resolved
    #[error("No parameter tokens to retrieve values from, please set a token map in the parameter options")]
    NoTokenMap,

    /// A placeholder resolved to an empty value and empty tokens are disallowed
    #[error("Couldn't find a value for ${{{token}}} in {key}; set allow_empty_tokens to continue")]
    MissingToken { token: String, key: String },

    /// Token values kept producing new placeholders
    #[error("Token substitution in {key} did not terminate; check for self-referencing tokens")]
    RecursiveToken { key: String },

    /// Filtering was requested without any parameters to filter
    #[error("Filtering requires a parameter list, but none was given or loaded")]
    MissingParameterList,

    /// The parameter source parsed to nothing
    #[error("No parameters found in {}", path.display())]
    NoParameters { path: PathBuf },

    #[error("Failed to read parameters from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse parameters in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by stack orchestration
#[derive(Debug, Error)]
pub enum StackError {
    #[error("Unknown stack action '{0}'. Supported: delete, recreate, create, update, deploy, createChangeSet, executeChangeSet")]
    UnknownAction(String),

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to relay output of `{command}`: {source}")]
    Output {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Failed to parse change set description: {0}")]
    DescribeParse(#[from] serde_json::Error),
}

impl StackError {
    /// Text reported by the external command, used to classify failures
    pub fn output(&self) -> Option<&str> {
        match self {
            StackError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Errors raised while reading or persisting stack exports
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to list CloudFormation exports: {0}")]
    List(String),

    #[error("Failed to serialize exports: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write exports to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while publishing to the parameter store
#[derive(Debug, Error)]
pub enum PublishError {
    /// The associated parameter set lacks a key needed for the hierarchical path
    #[error("Parameter set has no value for '{0}', cannot build the parameter store path")]
    MissingPathComponent(&'static str),

    #[error("Failed to put {path}: {reason}")]
    Put { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_message_names_token_and_key() {
        let err = ParameterError::MissingToken {
            token: "BucketName".to_string(),
            key: "DataBucket".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Couldn't find a value for ${BucketName} in DataBucket; set allow_empty_tokens to continue"
        );
    }

    #[test]
    fn command_failure_exposes_output() {
        let err = StackError::CommandFailed {
            command: "aws cloudformation update-stack".to_string(),
            status: "exit status: 254".to_string(),
            output: "No updates are to be performed.".to_string(),
        };
        assert_eq!(err.output(), Some("No updates are to be performed."));
        assert!(StackError::UnknownAction("x".into()).output().is_none());
    }
}
