// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_aws_config(&config.aws)?;
    validate_stack_defaults(&config.stack)?;

    Ok(())
}

fn validate_aws_config(config: &AwsConfig) -> Result<()> {
    if config.region.is_empty() {
        bail!("aws.region must not be empty");
    }

    if config.cli_path.is_empty() {
        bail!("aws.cli_path must not be empty");
    }

    if let Some(endpoint) = &config.endpoint_url {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            bail!("aws.endpoint_url must start with http:// or https://");
        }
    }

    Ok(())
}

fn validate_stack_defaults(config: &StackDefaults) -> Result<()> {
    if config.capabilities.is_empty() {
        bail!("stack.capabilities must list at least one capability");
    }

    for capability in &config.capabilities {
        if !capability.starts_with("CAPABILITY_") {
            warn!(
                capability = %capability,
                "stack.capabilities entry does not look like a CloudFormation capability"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_aws_config() {
        assert!(validate_aws_config(&AwsConfig::default()).is_ok());

        let empty_region = AwsConfig {
            region: String::new(),
            ..AwsConfig::default()
        };
        assert!(validate_aws_config(&empty_region).is_err());

        let bad_endpoint = AwsConfig {
            endpoint_url: Some("localhost:4566".to_string()),
            ..AwsConfig::default()
        };
        assert!(validate_aws_config(&bad_endpoint).is_err());
    }

    #[test]
    fn test_validate_stack_defaults() {
        assert!(validate_stack_defaults(&StackDefaults::default()).is_ok());

        let none = StackDefaults {
            wait: true,
            capabilities: Vec::new(),
        };
        assert!(validate_stack_defaults(&none).is_err());
    }
}
