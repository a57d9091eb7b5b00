use super::{LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "STACKHELPER_";

/// Abstraction over environment-variable lookups so tests can supply their own
/// source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the STACKHELPER_ prefix
    /// Used for AWS standard variables (AWS_REGION, AWS_ENDPOINT_URL)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // AWS standard variables first so the prefixed ones win
    if let Some(region) = get_raw_env_string(env, "AWS_REGION")? {
        config.aws.region = region;
    }
    if let Some(endpoint) = get_raw_env_string(env, "AWS_ENDPOINT_URL")? {
        config.aws.endpoint_url = Some(endpoint);
    }

    if let Some(region) = get_env_string(env, "REGION")? {
        config.aws.region = region;
    }
    if let Some(endpoint) = get_env_string(env, "ENDPOINT_URL")? {
        config.aws.endpoint_url = Some(endpoint);
    }
    if let Some(cli) = get_env_string(env, "AWS_CLI")? {
        config.aws.cli_path = cli;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.log.format = format
            .parse::<LogFormat>()
            .context("Invalid STACKHELPER_LOG_FORMAT value")?;
    }

    // Stack defaults
    if let Some(wait) = get_env_bool(env, "WAIT")? {
        config.stack.wait = wait;
    }
    if let Some(capabilities) = get_env_string(env, "CAPABILITIES")? {
        config.stack.capabilities = capabilities
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key))
}

fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get_raw(key))
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.get_raw(&format!("{}{}", ENV_PREFIX, key))
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn prefixed_region_wins_over_aws_region() {
        let env = MapEnv(HashMap::from([
            ("AWS_REGION", "us-west-2"),
            ("STACKHELPER_REGION", "eu-central-1"),
        ]));
        let mut config = RuntimeConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();
        assert_eq!(config.aws.region, "eu-central-1");
    }

    #[test]
    fn overrides_log_and_stack_settings() {
        let env = MapEnv(HashMap::from([
            ("STACKHELPER_LOG_LEVEL", "debug"),
            ("STACKHELPER_LOG_FORMAT", "json"),
            ("STACKHELPER_WAIT", "true"),
            ("STACKHELPER_CAPABILITIES", "CAPABILITY_IAM, CAPABILITY_AUTO_EXPAND"),
            ("AWS_ENDPOINT_URL", "http://localhost:4566"),
        ]));
        let mut config = RuntimeConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.stack.wait);
        assert_eq!(
            config.stack.capabilities,
            vec!["CAPABILITY_IAM", "CAPABILITY_AUTO_EXPAND"]
        );
        assert_eq!(
            config.aws.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
    }

    #[test]
    fn rejects_non_bool_wait() {
        let env = MapEnv(HashMap::from([("STACKHELPER_WAIT", "sometimes")]));
        let mut config = RuntimeConfig::default();
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(err.to_string().contains("STACKHELPER_WAIT"));
    }
}
