//! Ordered CloudFormation parameters with `${token}` substitution
//!
//! Parameters use the CloudFormation CLI JSON convention:
//! `[{"ParameterKey": "Key", "ParameterValue": "Value"}, ...]`.
//!
//! Loading from a file applies, in order: the key allow-list, token
//! substitution, then empty-value stripping. Filtering first means tokens in
//! parameters that will be discarded never have to resolve.

use crate::error::ParameterError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on substitutions within one value; only reachable when token
/// values keep reintroducing placeholders.
const MAX_SUBSTITUTIONS: usize = 1024;

type Result<T> = std::result::Result<T, ParameterError>;

/// A single stack parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "ParameterKey")]
    pub key: String,
    #[serde(rename = "ParameterValue")]
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// How a [`ParameterSet`] is filtered and substituted
#[derive(Debug, Clone, Default)]
pub struct ParameterOptions {
    /// Keep only these keys when loading from a file
    pub key_allow_list: Option<Vec<String>>,
    /// Values for `${token}` placeholders
    pub token_map: Option<HashMap<String, String>>,
    /// Drop parameters whose value is `""` after substitution
    pub strip_empty_parameters: bool,
    /// Let placeholders resolve to `""` instead of failing
    pub allow_empty_tokens: bool,
}

impl ParameterOptions {
    pub fn with_tokens<I, K, V>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            token_map: Some(
                tokens
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

/// Ordered parameter list, read-only once built
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Option<Vec<Parameter>>,
    options: ParameterOptions,
    source: Option<PathBuf>,
}

impl ParameterSet {
    /// An empty set holding only configuration; see [`ParameterSet::load_from_source`]
    pub fn new(options: ParameterOptions) -> Self {
        Self {
            parameters: None,
            options,
            source: None,
        }
    }

    /// Build from inline parameters, substituting tokens immediately
    pub fn from_parameters(parameters: Vec<Parameter>, options: ParameterOptions) -> Result<Self> {
        let mut set = Self::new(options);
        set.parameters = Some(set.substitute_tokens(&parameters)?);
        Ok(set)
    }

    /// Build from a parameter file
    pub fn from_file(path: impl AsRef<Path>, options: ParameterOptions) -> Result<Self> {
        let mut set = Self::new(options);
        set.load_from_source(path)?;
        Ok(set)
    }

    pub fn options(&self) -> &ParameterOptions {
        &self.options
    }

    /// The loaded parameters, or an empty slice when nothing has been loaded
    pub fn parameters(&self) -> &[Parameter] {
        self.parameters.as_deref().unwrap_or_default()
    }

    /// File the parameters were loaded from, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Read a parameter file and apply allow-list, substitution and stripping
    pub fn load_from_source(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading parameters");

        let content = std::fs::read_to_string(path).map_err(|source| ParameterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Option<Vec<Parameter>> =
            serde_json::from_str(&content).map_err(|source| ParameterError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let mut params = parsed.ok_or_else(|| ParameterError::NoParameters {
            path: path.to_path_buf(),
        })?;

        if let Some(keys) = &self.options.key_allow_list {
            params = self.filter_by_key_allow_list(keys.as_slice(), Some(params.as_slice()))?;
        }

        params = self.substitute_tokens(&params)?;

        if self.options.strip_empty_parameters {
            params = Self::strip_empty_parameters(params);
        }

        self.source = Some(path.to_path_buf());
        self.parameters = Some(params);
        Ok(())
    }

    /// Replace every `${name}` in every value, leftmost first, until none remain
    pub fn substitute_tokens(&self, params: &[Parameter]) -> Result<Vec<Parameter>> {
        let tokens = self
            .options
            .token_map
            .as_ref()
            .ok_or(ParameterError::NoTokenMap)?;

        params
            .iter()
            .map(|param| {
                let value = self.substitute_value(tokens, param)?;
                Ok(Parameter::new(param.key.clone(), value))
            })
            .collect()
    }

    fn substitute_value(
        &self,
        tokens: &HashMap<String, String>,
        param: &Parameter,
    ) -> Result<String> {
        let mut value = param.value.clone();
        let mut substitutions = 0;

        while let Some((start, end)) = find_token(&value) {
            if substitutions == MAX_SUBSTITUTIONS {
                return Err(ParameterError::RecursiveToken {
                    key: param.key.clone(),
                });
            }
            substitutions += 1;

            let name = &value[start + 2..end];
            let replacement = tokens.get(name).map(String::as_str).unwrap_or_default();

            if replacement.is_empty() {
                warn!(
                    token = name,
                    key = %param.key,
                    "Couldn't find a value for token"
                );
                if !self.options.allow_empty_tokens {
                    return Err(ParameterError::MissingToken {
                        token: name.to_string(),
                        key: param.key.clone(),
                    });
                }
            }

            value = format!("{}{}{}", &value[..start], replacement, &value[end + 1..]);
        }

        Ok(value)
    }

    /// Keep parameters whose key is listed, in their original order.
    /// Falls back to the stored parameters when `params` is `None`.
    pub fn filter_by_key_allow_list<K: AsRef<str>>(
        &self,
        keys: &[K],
        params: Option<&[Parameter]>,
    ) -> Result<Vec<Parameter>> {
        let params = params
            .or(self.parameters.as_deref())
            .ok_or(ParameterError::MissingParameterList)?;

        Ok(params
            .iter()
            .filter(|param| keys.iter().any(|k| k.as_ref() == param.key))
            .cloned()
            .collect())
    }

    /// Remove parameters whose value is exactly the empty string
    pub fn strip_empty_parameters(params: Vec<Parameter>) -> Vec<Parameter> {
        params.into_iter().filter(|p| !p.value.is_empty()).collect()
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters()
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Compact JSON parameter list, as passed to `--parameters`
    pub fn to_json(&self) -> String {
        json_string(self.parameters())
    }

    /// JSON parameter list with `"` escaped for a double-quoted shell argument
    pub fn to_cli_string(&self) -> String {
        cli_string(self.parameters())
    }

    /// Key to value, ordered by first occurrence; a repeated key keeps its last value
    pub fn flat_parameters(&self) -> IndexMap<String, String> {
        flat_parameters(self.parameters())
    }

    /// `key=value ` pairs of [`ParameterSet::flat_parameters`], unescaped, for display
    pub fn to_flat_string(&self) -> String {
        flat_string(&self.flat_parameters())
    }

    /// `key=value` pairs as separate arguments for `--parameter-overrides`
    pub fn override_pairs(&self) -> Vec<String> {
        self.flat_parameters()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

/// Byte range of the leftmost `${name}`: start of `$` and index of the closing `}`
fn find_token(value: &str) -> Option<(usize, usize)> {
    let start = value.find("${")?;
    let end = value[start + 2..].find('}')? + start + 2;
    Some((start, end))
}

pub fn json_string(params: &[Parameter]) -> String {
    // Serializing a slice of plain string structs cannot fail.
    serde_json::to_string(params).unwrap_or_default()
}

/// Compact JSON of `params` with every double quote escaped
pub fn cli_string(params: &[Parameter]) -> String {
    escape_double_quotes(&json_string(params))
}

pub(crate) fn escape_double_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

pub fn flat_parameters(params: &[Parameter]) -> IndexMap<String, String> {
    let mut flat = IndexMap::with_capacity(params.len());
    for param in params {
        flat.insert(param.key.clone(), param.value.clone());
    }
    flat
}

pub fn flat_string(flat: &IndexMap<String, String>) -> String {
    flat.iter()
        .map(|(key, value)| format!("{}={} ", key, value))
        .collect()
}
