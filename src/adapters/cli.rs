// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line bootstrap flags.
//!
//! This module provides `ConfigArgs`, a set of clap arguments an application
//! flattens into its own parser to choose a configuration address and to
//! override individual keys, and the bootstrap routine that wires them into a
//! [`Configuration`].

use crate::adapters::env_var::EnvVarAdapter;
use crate::adapters::{formats, registry};
use crate::domain::tree::{merge, unflatten};
use crate::domain::{ConfigError, ConfigMap, ConfigValue, Result};
use crate::ports::DataSource;
use crate::service::Configuration;
use clap::{Args, Parser};
use std::sync::Arc;

/// Default prefix of environment variables picked up by bootstrap.
pub const DEFAULT_ENV_PREFIX: &str = "APP_";

/// Configuration flags for an application's command line.
///
/// Precedence is `--set` over environment variables over the configuration
/// address, and it holds across reloads of a watched source.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use dyncfg::adapters::ConfigArgs;
///
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     config: ConfigArgs,
/// }
///
/// let cli = Cli::parse_from(["app", "--set", "server.port=9090", "--watch"]);
/// assert!(cli.config.watch);
/// assert_eq!(cli.config.set, vec![("server.port".to_string(), "9090".to_string())]);
/// ```
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Configuration address: a file path or `scheme://...`
    #[arg(long = "config", value_name = "ADDR")]
    pub config: Option<String>,

    /// Reload the configuration when the source changes
    #[arg(long)]
    pub watch: bool,

    /// Prefix of environment variables applied over the configuration
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,

    /// Override a single key, e.g. `--set server.http.port=8080`
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

#[derive(Debug, Parser)]
struct ConfigCli {
    #[command(flatten)]
    args: ConfigArgs,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

impl ConfigArgs {
    /// Parses the flags from an argument list whose first item is the
    /// program name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dyncfg::adapters::ConfigArgs;
    ///
    /// let args = ConfigArgs::from_args(["app", "--config", "config.toml"]).unwrap();
    /// assert_eq!(args.config.as_deref(), Some("config.toml"));
    /// assert_eq!(args.env_prefix, "APP_");
    /// ```
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        ConfigCli::try_parse_from(args)
            .map(|cli| cli.args)
            .map_err(|e| ConfigError::ParseError {
                message: format!("Invalid command-line arguments: {}", e),
                source: Some(Box::new(e)),
            })
    }

    /// Parses the flags from the process arguments.
    pub fn from_env_args() -> Result<Self> {
        Self::from_args(std::env::args_os())
    }

    /// Returns environment variables and `--set` pairs as one nested map,
    /// `--set` winning.
    fn overrides(&self, delimiter: &str) -> ConfigMap {
        let env = EnvVarAdapter::with_prefix(self.env_prefix.as_str())
            .lowercase_keys(true)
            .delimiter(delimiter)
            .collect();
        let entries = env
            .into_iter()
            .chain(self.set.iter().cloned())
            .map(|(key, value)| (key, ConfigValue::from(value)));
        unflatten(entries, delimiter)
    }

    /// Loads configuration into `config` according to the flags.
    ///
    /// When an address is given, its data source is created through the
    /// registry, decoded by the unmarshaller matching its extension and bound
    /// to `config`; failures are returned. Environment variables and `--set`
    /// overrides are layered over every payload of that source. The bound
    /// source is returned so the caller can close it.
    pub fn bootstrap(&self, config: &Configuration) -> Result<Option<Arc<dyn DataSource>>> {
        let overrides = self.overrides(config.key_delimiter());

        let Some(address) = self.config.as_deref() else {
            config.apply(overrides)?;
            return Ok(None);
        };

        let source = registry::new_data_source(address, self.watch)?;
        let decoder = formats::unmarshaller_for_path(address)?;
        let layered = move |content: &[u8]| -> Result<ConfigMap> {
            let mut map = decoder.unmarshal(content)?;
            merge(&mut map, overrides.clone());
            Ok(map)
        };

        config.load_from_data_source(Arc::clone(&source), Arc::new(layered))?;
        tracing::info!(address, watch = self.watch, "bootstrapped configuration");
        Ok(Some(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_parse_defaults() {
        let args = ConfigArgs::from_args(["app"]).unwrap();
        assert_eq!(args.config, None);
        assert!(!args.watch);
        assert_eq!(args.env_prefix, DEFAULT_ENV_PREFIX);
        assert!(args.set.is_empty());
    }

    #[test]
    fn test_parse_repeated_set() {
        let args = ConfigArgs::from_args([
            "app",
            "--set",
            "a.b=1",
            "--set=c=x=y",
            "--env-prefix",
            "SVC_",
        ])
        .unwrap();
        assert_eq!(
            args.set,
            vec![
                ("a.b".to_string(), "1".to_string()),
                ("c".to_string(), "x=y".to_string())
            ]
        );
        assert_eq!(args.env_prefix, "SVC_");
    }

    #[test]
    fn test_parse_rejects_malformed_set() {
        assert!(ConfigArgs::from_args(["app", "--set", "novalue"]).is_err());
        assert!(ConfigArgs::from_args(["app", "--set", "=1"]).is_err());
    }

    #[test]
    fn test_bootstrap_without_address_applies_overrides() {
        let args = ConfigArgs::from_args([
            "app",
            "--env-prefix",
            "DYNCFG_CLI_TEST_UNUSED_",
            "--set",
            "server.port=9090",
        ])
        .unwrap();
        let config = Configuration::new();
        assert!(args.bootstrap(&config).unwrap().is_none());
        assert_eq!(config.get_int("server.port"), 9090);
    }

    #[test]
    fn test_bootstrap_layers_set_over_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"server": {{"port": 80, "host": "localhost"}}}}"#).unwrap();

        let address = file.path().to_str().unwrap().to_string();
        let args = ConfigArgs::from_args([
            "app",
            "--config",
            address.as_str(),
            "--env-prefix",
            "DYNCFG_CLI_TEST_UNUSED_",
            "--set",
            "server.port=9090",
        ])
        .unwrap();

        let config = Configuration::new();
        let source = args.bootstrap(&config).unwrap().unwrap();
        assert_eq!(config.get_int("server.port"), 9090);
        assert_eq!(config.get_string("server.host"), "localhost");
        source.close().unwrap();
    }

    #[test]
    fn test_bootstrap_unsupported_extension() {
        let file = Builder::new().suffix(".ini").tempfile().unwrap();
        let args = ConfigArgs::from_args(["app", "--config", file.path().to_str().unwrap()])
            .unwrap();
        let result = args.bootstrap(&Configuration::new());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }
}
