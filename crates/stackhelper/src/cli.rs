//! Command line arguments for both binaries

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stackhelper_config::RuntimeConfig;
use stackhelper_core::{ParameterOptions, ParameterSet, StackAction, StackError};
use std::collections::HashMap;
use std::path::PathBuf;

/// CloudFormation deploy helper
#[derive(Parser, Debug)]
#[command(name = "stackhelper")]
#[command(version)]
#[command(about = "Run CloudFormation stack actions with token-substituted parameters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Read an application's CloudFormation exports into a JSON file
#[derive(Parser, Debug)]
#[command(name = "app-exports")]
#[command(version)]
pub struct AppExportsCli {
    #[command(flatten)]
    pub exports: ExportsArgs,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one action against a stack
    Stack(StackArgs),
    /// Publish values into the SSM Parameter Store under /{AppName}/{Environment}/
    Publish(PublishArgs),
    /// Read an application's CloudFormation exports
    Exports(ExportsArgs),
    /// Print the resolved parameters
    Params(ParamsArgs),
}

/// Options accepted by every command
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// AWS region (overrides config file and environment)
    #[arg(long, value_name = "REGION", global = true)]
    pub region: Option<String>,
}

impl GlobalArgs {
    /// Merge config sources, then apply flag overrides (highest priority).
    /// The result is not validated yet; `stackhelper::init` validates it.
    pub fn resolve_config(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::resolve_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => RuntimeConfig::resolve().context("Failed to load configuration")?,
        };

        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if let Some(region) = &self.region {
            config.aws.region = region.clone();
        }

        Ok(config)
    }
}

/// Where parameters come from and how they are resolved
#[derive(Args, Debug)]
pub struct ParameterArgs {
    /// JSON parameter file: [{"ParameterKey": ..., "ParameterValue": ...}]
    #[arg(long, value_name = "FILE")]
    pub parameters_file: PathBuf,

    /// Token value for ${KEY} placeholders (repeatable)
    #[arg(long = "token", value_name = "KEY=VALUE", value_parser = parse_token)]
    pub tokens: Vec<(String, String)>,

    /// JSON object of token values; --token entries take precedence
    #[arg(long, value_name = "FILE")]
    pub tokens_file: Option<PathBuf>,

    /// Keep only these parameter keys (repeatable)
    #[arg(long = "key", value_name = "KEY")]
    pub keys: Vec<String>,

    /// Drop parameters whose value is empty after substitution
    #[arg(long)]
    pub strip_empty: bool,

    /// Allow tokens that resolve to an empty value
    #[arg(long)]
    pub allow_empty_tokens: bool,
}

impl ParameterArgs {
    pub fn options(&self) -> Result<ParameterOptions> {
        let mut tokens: HashMap<String, String> = match &self.tokens_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read tokens file: {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse tokens file: {}", path.display()))?
            }
            None => HashMap::new(),
        };
        tokens.extend(self.tokens.iter().cloned());

        Ok(ParameterOptions {
            key_allow_list: (!self.keys.is_empty()).then(|| self.keys.clone()),
            token_map: Some(tokens),
            strip_empty_parameters: self.strip_empty,
            allow_empty_tokens: self.allow_empty_tokens,
        })
    }

    pub fn load(&self) -> Result<ParameterSet> {
        let options = self.options()?;
        ParameterSet::from_file(&self.parameters_file, options).with_context(|| {
            format!(
                "Failed to load parameters from {}",
                self.parameters_file.display()
            )
        })
    }
}

#[derive(Args, Debug)]
pub struct StackArgs {
    /// delete, recreate, create, update, deploy, createChangeSet or executeChangeSet
    #[arg(value_name = "ACTION", value_parser = parse_action)]
    pub action: StackAction,

    /// CloudFormation stack name
    #[arg(long)]
    pub stack_name: String,

    /// Template file
    #[arg(long, value_name = "FILE")]
    pub template: PathBuf,

    #[command(flatten)]
    pub parameters: ParameterArgs,

    /// Block until the stack operation completes
    #[arg(long)]
    pub wait: bool,

    /// With createChangeSet, print the request skeleton instead of submitting
    #[arg(long)]
    pub generate_only: bool,
}

impl StackArgs {
    /// The action with --generate-only folded in
    pub fn stack_action(&self) -> StackAction {
        match self.action {
            StackAction::CreateChangeSet { .. } => StackAction::CreateChangeSet {
                generate_only: self.generate_only,
            },
            other => other,
        }
    }
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub parameters: ParameterArgs,

    /// JSON list of {name, value, type, description} records
    #[arg(long, value_name = "FILE")]
    pub records: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportsArgs {
    /// Application name; the leading part of every export name
    #[arg(long)]
    pub app_name: String,

    /// Environment suffix appended to the app name (e.g. -Prod)
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub environment: String,

    /// Output file
    #[arg(short, long, value_name = "FILE", default_value = "./exports.json")]
    pub output: PathBuf,

    /// Print the exports as pretty JSON instead of writing the file
    #[arg(short, long)]
    pub dump: bool,

    /// Indent the written file
    #[arg(short, long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub parameters: ParameterArgs,

    /// Rendering of the resolved parameters
    #[arg(long, value_enum, default_value_t = ParamsFormat::Json)]
    pub format: ParamsFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParamsFormat {
    /// CloudFormation JSON list
    Json,
    /// JSON with double quotes escaped for a quoted shell argument
    Cli,
    /// Space separated KEY=VALUE pairs
    Flat,
}

fn parse_token(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_action(s: &str) -> std::result::Result<StackAction, StackError> {
    s.parse()
}
