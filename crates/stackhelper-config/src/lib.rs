// stackhelper-config - Runtime configuration for the stackhelper binaries
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from --config or STACKHELPER_CONFIG
// 3. Config file contents from STACKHELPER_CONFIG_CONTENT
// 4. Default config file locations (./stackhelper.toml, ./.stackhelper.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub stack: StackDefaults,
}

/// AWS access configuration shared by the SDK clients and the CLI wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint (LocalStack and friends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Program used for `aws cloudformation ...` invocations
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_cli_path() -> String {
    "aws".to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            cli_path: default_cli_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Defaults applied to every stack operation unless a flag overrides them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDefaults {
    /// Block on the matching `aws cloudformation wait` call after each mutation
    #[serde(default)]
    pub wait: bool,

    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

fn default_capabilities() -> Vec<String> {
    vec![
        "CAPABILITY_NAMED_IAM".to_string(),
        "CAPABILITY_AUTO_EXPAND".to_string(),
    ]
}

impl Default for StackDefaults {
    fn default() -> Self {
        Self {
            wait: false,
            capabilities: default_capabilities(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from an explicit file (for the --config flag)
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Merge the same sources as [`RuntimeConfig::load`] without validating
    pub fn resolve() -> Result<Self> {
        sources::resolve_config()
    }

    /// Merge an explicit file and the environment without validating
    pub fn resolve_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::resolve_from_file_path(path)
    }

    /// Parse a TOML document without consulting files or the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
