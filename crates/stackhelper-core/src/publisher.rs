//! Publish derived values into the SSM Parameter Store
//!
//! Values land under `/{AppName}/{Environment}/{name}`, with both path
//! components read from the application's [`ParameterSet`]. Batches are
//! published one put at a time; a failed put is logged and the batch goes on.

use crate::error::PublishError;
use crate::parameters::ParameterSet;
use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info};

type Result<T> = std::result::Result<T, PublishError>;

const APP_NAME_KEY: &str = "AppName";
const ENVIRONMENT_KEY: &str = "Environment";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    #[default]
    String,
    StringList,
    SecureString,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "String",
            ParameterType::StringList => "StringList",
            ParameterType::SecureString => "SecureString",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value to publish, named relative to the application path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteParameter {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: ParameterType,
    #[serde(default)]
    pub description: String,
}

impl RemoteParameter {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            description: description.into(),
        }
    }
}

/// Fully resolved put request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub path: String,
    pub kind: ParameterType,
    pub value: String,
    pub description: String,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// Version assigned by the store
    pub version: i64,
}

/// Destination for put requests
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn put(&self, request: &PutRequest) -> Result<PutOutcome>;
}

#[async_trait]
impl ParameterStore for aws_sdk_ssm::Client {
    async fn put(&self, request: &PutRequest) -> Result<PutOutcome> {
        let output = self
            .put_parameter()
            .name(&request.path)
            .r#type(aws_sdk_ssm::types::ParameterType::from(request.kind.as_str()))
            .value(&request.value)
            .description(&request.description)
            .overwrite(request.overwrite)
            .send()
            .await
            .map_err(|e| PublishError::Put {
                path: request.path.clone(),
                reason: DisplayErrorContext(e).to_string(),
            })?;

        Ok(PutOutcome {
            version: output.version(),
        })
    }
}

/// Outcome of one put within a batch
#[derive(Debug)]
pub struct PublishResult {
    pub name: String,
    pub result: Result<PutOutcome>,
}

/// Every attempt of a batch, in order
#[derive(Debug, Default)]
pub struct PublishReport {
    pub results: Vec<PublishResult>,
}

impl PublishReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &PublishResult> {
        self.results.iter().filter(|r| r.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

pub struct Publisher<S> {
    store: S,
    parameters: ParameterSet,
}

impl<S: ParameterStore> Publisher<S> {
    pub fn new(store: S, parameters: ParameterSet) -> Self {
        Self { store, parameters }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the overwrite-enabled request for `record`
    pub fn request_for(&self, record: &RemoteParameter) -> Result<PutRequest> {
        let app_name = self
            .parameters
            .get(APP_NAME_KEY)
            .ok_or(PublishError::MissingPathComponent(APP_NAME_KEY))?;
        let environment = self
            .parameters
            .get(ENVIRONMENT_KEY)
            .ok_or(PublishError::MissingPathComponent(ENVIRONMENT_KEY))?;

        Ok(PutRequest {
            path: format!("/{}/{}/{}", app_name, environment, record.name),
            kind: record.kind,
            value: record.value.clone(),
            description: format!("{} {} {}", app_name, environment, record.description),
            overwrite: true,
        })
    }

    pub async fn put(&self, record: &RemoteParameter) -> Result<PutOutcome> {
        let request = self.request_for(record)?;
        info!(path = %request.path, kind = %request.kind, "Putting parameter");
        self.store.put(&request).await
    }

    /// Put every record in order; failures are logged and recorded, never fatal
    pub async fn put_all(&self, records: &[RemoteParameter]) -> PublishReport {
        info!(count = records.len(), "Putting all parameters");

        let mut report = PublishReport::default();
        for record in records {
            let result = self.put(record).await;
            if let Err(err) = &result {
                error!(name = %record.name, error = %err, "Failed to put parameter");
            }
            report.results.push(PublishResult {
                name: record.name.clone(),
                result,
            });
        }
        report
    }
}
