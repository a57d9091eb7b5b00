//! Application-scoped view of CloudFormation exports
//!
//! Exports live in one flat, region-wide namespace. An application's exports
//! are the ones named `{app_name}{environment}...`; the prefix is stripped so
//! the result can be consumed as plain configuration.

use crate::error::ExportError;
use async_trait::async_trait;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use serde::Serialize;
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, error};

type Result<T> = std::result::Result<T, ExportError>;

/// One entry of the export namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub name: String,
    pub value: String,
}

impl ExportRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Anything that can list the export namespace in a single call
#[async_trait]
pub trait ExportSource: Send + Sync {
    async fn fetch_exports(&self) -> Result<Vec<ExportRecord>>;
}

#[async_trait]
impl ExportSource for aws_sdk_cloudformation::Client {
    async fn fetch_exports(&self) -> Result<Vec<ExportRecord>> {
        // A single page; accounts with more exports than one page holds are not handled.
        let output = self
            .list_exports()
            .send()
            .await
            .map_err(|e| ExportError::List(DisplayErrorContext(e).to_string()))?;

        Ok(output
            .exports()
            .iter()
            .filter_map(|export| match (export.name(), export.value()) {
                (Some(name), Some(value)) => Some(ExportRecord::new(name, value)),
                _ => None,
            })
            .collect())
    }
}

/// Exports with the application prefix removed, in listing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExportMap(IndexMap<String, String>);

impl ExportMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> IndexMap<String, String> {
        self.0
    }

    /// JSON text; `pretty` indents with tabs
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        if !pretty {
            return Ok(serde_json::to_string(&self.0)?);
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Persist this map to `path`
    pub fn write(&self, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json(pretty)?;
        std::fs::write(path, json).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), exports = self.len(), "Wrote exports");
        Ok(())
    }
}

impl FromIterator<(String, String)> for ExportMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub struct ExportReader<S> {
    source: S,
}

impl<S: ExportSource> ExportReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Exports named `{app_name}{environment}*`, keyed by the remainder of the name
    pub async fn fetch(&self, app_name: &str, environment: &str) -> Result<ExportMap> {
        let prefix = format!("{}{}", app_name, environment);

        let records = match self.source.fetch_exports().await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "Failed to list exports");
                return Err(err);
            }
        };

        let total = records.len();
        let exports: ExportMap = records
            .into_iter()
            .filter_map(|record| {
                record
                    .name
                    .strip_prefix(&prefix)
                    .map(|key| (key.to_string(), record.value.clone()))
            })
            .collect();

        debug!(prefix = %prefix, total, matched = exports.len(), "Filtered exports");
        Ok(exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> ExportMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn pretty_json_uses_tabs() {
        let exports = map(&[("Url", "https://example.com"), ("Port", "443")]);
        assert_eq!(
            exports.to_json(true).unwrap(),
            "{\n\t\"Url\": \"https://example.com\",\n\t\"Port\": \"443\"\n}"
        );
    }

    #[test]
    fn compact_json_has_no_whitespace() {
        let exports = map(&[("Url", "u")]);
        assert_eq!(exports.to_json(false).unwrap(), r#"{"Url":"u"}"#);
    }

    #[test]
    fn write_persists_the_map_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports.json");
        let exports = map(&[("Bucket", "data-bucket")]);

        exports.write(&path, false).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, r#"{"Bucket":"data-bucket"}"#);
    }

    #[test]
    fn write_to_missing_directory_fails_with_path() {
        let err = map(&[])
            .write("/nonexistent/dir/exports.json", true)
            .unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
        assert!(err.to_string().contains("/nonexistent/dir/exports.json"));
    }
}
