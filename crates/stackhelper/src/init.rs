// Process-wide initialization shared by both binaries
//
// Logging/tracing setup and the AWS SDK configuration

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use stackhelper_config::{AwsConfig, LogFormat, RuntimeConfig};
use tracing::debug;

/// Resolve configuration, install tracing, then validate once so validation
/// warnings reach the subscriber
pub fn init(global: &GlobalArgs) -> Result<RuntimeConfig> {
    let config = global.resolve_config()?;
    init_tracing(&config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Initialize tracing from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.log.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
    };
}

/// SDK configuration for the CloudFormation and SSM clients
pub async fn aws_sdk_config(aws: &AwsConfig) -> aws_config::SdkConfig {
    use aws_config::{BehaviorVersion, Region};

    debug!(region = %aws.region, endpoint = ?aws.endpoint_url, "Loading AWS configuration");

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws.region.clone()));
    if let Some(endpoint) = &aws.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}
