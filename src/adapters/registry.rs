// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheme-keyed registry of data source constructors.
//!
//! An address such as `file:///etc/app/config.toml` or
//! `etcd://127.0.0.1:2379/app` selects a constructor by its scheme. Addresses
//! without a scheme are files.

use crate::adapters::file::FileDataSource;
use crate::domain::{ConfigError, Result};
use crate::ports::DataSource;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Scheme used for addresses that carry none.
pub const DEFAULT_SCHEME: &str = "file";

/// Builds a data source from its full address and the watch flag.
pub type DataSourceCreator = Arc<dyn Fn(&str, bool) -> Result<Arc<dyn DataSource>> + Send + Sync>;

static REGISTRY: Lazy<RwLock<HashMap<String, DataSourceCreator>>> = Lazy::new(|| {
    let mut creators: HashMap<String, DataSourceCreator> = HashMap::new();
    creators.insert(DEFAULT_SCHEME.to_string(), Arc::new(create_file_source));
    RwLock::new(creators)
});

fn create_file_source(address: &str, watch: bool) -> Result<Arc<dyn DataSource>> {
    let path = address.strip_prefix("file://").unwrap_or(address);
    Ok(Arc::new(FileDataSource::new(path, watch)?))
}

/// Returns the scheme of `address`, or [`DEFAULT_SCHEME`].
pub fn scheme_of(address: &str) -> &str {
    match address.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => scheme,
        _ => DEFAULT_SCHEME,
    }
}

/// Registers `creator` for `scheme`, replacing any previous registration.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::{registry, MemoryDataSource};
/// use dyncfg::ports::DataSource;
/// use std::sync::Arc;
///
/// registry::register("mem", |_address: &str, _watch: bool| {
///     let source: Arc<dyn DataSource> = Arc::new(MemoryDataSource::new(r#"{"a": 1}"#));
///     Ok(source)
/// });
///
/// let source = registry::new_data_source("mem://anything", false).unwrap();
/// assert_eq!(source.name(), "memory");
/// ```
pub fn register<F>(scheme: impl Into<String>, creator: F)
where
    F: Fn(&str, bool) -> Result<Arc<dyn DataSource>> + Send + Sync + 'static,
{
    let scheme = scheme.into();
    tracing::debug!(scheme = %scheme, "registered data source scheme");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(scheme, Arc::new(creator));
}

/// Creates the data source for `address`.
///
/// # Errors
///
/// * [`ConfigError::EmptyAddress`] - `address` is empty
/// * [`ConfigError::InvalidDataSource`] - no constructor is registered for the
///   scheme
/// * any error of the constructor itself
pub fn new_data_source(address: &str, watch: bool) -> Result<Arc<dyn DataSource>> {
    if address.trim().is_empty() {
        return Err(ConfigError::EmptyAddress);
    }

    let scheme = scheme_of(address);
    let creator = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(scheme)
        .cloned()
        .ok_or_else(|| ConfigError::InvalidDataSource {
            scheme: scheme.to_string(),
        })?;

    creator(address, watch)
}
