// Configuration source loading.
//
// Priority order:
// 1. Environment variables (STACKHELPER_* prefix)
// 2. Config file path from STACKHELPER_CONFIG
// 3. Inline config content from STACKHELPER_CONFIG_CONTENT
// 4. Default config files (./stackhelper.toml, ./.stackhelper.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_PATHS: &[&str] = &["./stackhelper.toml", "./.stackhelper.toml"];

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    let config = resolve_config()?;
    config.validate()?;
    Ok(config)
}

/// File and environment sources merged, without validation, so callers can
/// apply further overrides before validating once.
pub fn resolve_config() -> Result<RuntimeConfig> {
    let mut config = load_from_file()?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("STACKHELPER_CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("STACKHELPER_CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from STACKHELPER_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
/// Environment overrides still apply on top of the file.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let config = resolve_from_file_path(path)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_from_file_path`] but leaves validation to the caller.
pub fn resolve_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_config_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_explicit_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[aws]
cli_path = "/opt/aws/bin/aws"

[log]
level = "warn"
"#
        )
        .unwrap();

        let config = read_config_file(file.path()).unwrap();
        assert_eq!(config.aws.cli_path, "/opt/aws/bin/aws");
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[test]
    fn resolving_defers_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aws]\nregion = \"\"").unwrap();

        let mut config = resolve_from_file_path(file.path()).unwrap();
        assert!(config.validate().is_err());
        assert!(load_from_file_path(file.path()).is_err());

        config.aws.region = "eu-north-1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_names_path() {
        let err = read_config_file(Path::new("/nonexistent/stackhelper.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stackhelper.toml"));
    }

    #[test]
    fn malformed_config_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aws\nregion = ").unwrap();
        assert!(read_config_file(file.path()).is_err());
    }
}
