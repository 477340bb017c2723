// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable adapter.
//!
//! This module provides an adapter that turns environment variables into flat
//! configuration keys.

use std::collections::BTreeMap;
use std::env;

/// Maximum length for environment variable keys (prevents DoS)
const MAX_ENV_KEY_LEN: usize = 512;

/// Maximum length for environment variable values (prevents DoS)
const MAX_ENV_VALUE_LEN: usize = 1048576; // 1MB

/// Collects environment variables as flat configuration keys.
///
/// Variables are filtered by an optional prefix, which is stripped. The rest
/// of the name is optionally lowercased and has its underscores replaced by
/// the key delimiter.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::EnvVarAdapter;
/// use std::collections::BTreeMap;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("APP_SERVER_PORT".to_string(), "8080".to_string());
/// vars.insert("PATH".to_string(), "/usr/bin".to_string());
///
/// let collected = EnvVarAdapter::with_values(vars)
///     .prefix("APP_")
///     .lowercase_keys(true)
///     .collect();
/// assert_eq!(collected.get("server.port").map(String::as_str), Some("8080"));
/// assert_eq!(collected.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EnvVarAdapter {
    /// Optional prefix to filter environment variables
    prefix: Option<String>,
    /// Whether to convert keys to lowercase
    lowercase_keys: bool,
    /// Whether to replace underscores with the delimiter
    replace_underscores: bool,
    /// Key delimiter underscores are replaced with
    delimiter: String,
    /// Fixed variables used instead of the process environment
    values: Option<BTreeMap<String, String>>,
}

impl EnvVarAdapter {
    /// Creates an adapter reading every process environment variable.
    pub fn new() -> Self {
        Self {
            prefix: None,
            lowercase_keys: false,
            replace_underscores: true,
            delimiter: ".".to_string(),
            values: None,
        }
    }

    /// Creates an adapter reading only variables starting with `prefix`.
    ///
    /// The prefix is stripped from the key.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new().prefix(prefix)
    }

    /// Creates an adapter over fixed variables instead of the process
    /// environment.
    ///
    /// Prefix filtering and key transformations still apply, which makes this
    /// useful in tests.
    pub fn with_values(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Some(values),
            ..Self::new()
        }
    }

    /// Sets the prefix filter. An empty prefix accepts every variable.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Sets whether to convert keys to lowercase.
    pub fn lowercase_keys(mut self, enabled: bool) -> Self {
        self.lowercase_keys = enabled;
        self
    }

    /// Sets whether to replace underscores with the delimiter (default on).
    pub fn replace_underscores(mut self, enabled: bool) -> Self {
        self.replace_underscores = enabled;
        self
    }

    /// Sets the key delimiter (default `"."`).
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    fn transform(&self, name: &str) -> Option<String> {
        let stripped = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?,
            None => name,
        };
        if stripped.is_empty() {
            return None;
        }

        let mut key = stripped.to_string();
        if self.lowercase_keys {
            key = key.to_lowercase();
        }
        if self.replace_underscores {
            key = key.replace('_', &self.delimiter);
        }
        Some(key)
    }

    fn raw_vars(&self) -> Vec<(String, String)> {
        if let Some(values) = &self.values {
            return values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }

        env::vars_os()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    tracing::debug!(key = ?key, "Skipping environment variable that is not valid UTF-8");
                    None
                }
            })
            .collect()
    }

    /// Returns the matching variables keyed by their transformed names.
    pub fn collect(&self) -> BTreeMap<String, String> {
        let mut collected = BTreeMap::new();

        for (name, value) in self.raw_vars() {
            // Validate input sizes to prevent DoS
            if name.len() > MAX_ENV_KEY_LEN || value.len() > MAX_ENV_VALUE_LEN {
                tracing::debug!(
                    "Skipping oversized environment variable: key_len={}, value_len={} (max key={}, max value={})",
                    name.len(),
                    value.len(),
                    MAX_ENV_KEY_LEN,
                    MAX_ENV_VALUE_LEN
                );
                continue;
            }

            if let Some(key) = self.transform(&name) {
                collected.insert(key, value);
            }
        }

        tracing::debug!(
            "Collected {} environment variables (prefix={:?}, lowercase={}, replace_underscores={})",
            collected.len(),
            self.prefix,
            self.lowercase_keys,
            self.replace_underscores
        );

        collected
    }
}

impl Default for EnvVarAdapter {
    fn default() -> Self {
        Self::new()
    }
}
