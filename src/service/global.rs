// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide default configuration.
//!
//! The free functions in this module forward to a lazily created default
//! [`Configuration`]. Components that want to be testable in isolation should
//! take a `Configuration` handle instead and receive
//! [`default_configuration`] from their caller.

use crate::domain::{ChangeSet, ConfigMap, ConfigValue, FlatMap, GetOptions, Result};
use crate::ports::{DataSource, Unmarshaller};
use crate::service::configuration::Configuration;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

static DEFAULT_CONFIGURATION: Lazy<RwLock<Configuration>> =
    Lazy::new(|| RwLock::new(Configuration::new()));

/// Returns a handle to the current default configuration.
pub fn default_configuration() -> Configuration {
    DEFAULT_CONFIGURATION
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the default configuration with a fresh, empty one.
///
/// Handles obtained earlier, their watchers, and their reload loops keep
/// working against the old instance, which no longer receives updates made
/// through this module.
pub fn reset() {
    let mut slot = DEFAULT_CONFIGURATION
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = Configuration::new();
}

/// See [`Configuration::apply`].
pub fn apply(incoming: ConfigMap) -> Result<ChangeSet> {
    default_configuration().apply(incoming)
}

/// See [`Configuration::load`].
pub fn load<U: Unmarshaller + ?Sized>(content: &[u8], unmarshaller: &U) -> Result<()> {
    default_configuration().load(content, unmarshaller)
}

/// See [`Configuration::load_from_reader`].
pub fn load_from_reader<R: Read, U: Unmarshaller + ?Sized>(
    reader: R,
    unmarshaller: &U,
) -> Result<()> {
    default_configuration().load_from_reader(reader, unmarshaller)
}

/// See [`Configuration::load_from_data_source`].
pub fn load_from_data_source<S, U>(source: Arc<S>, unmarshaller: Arc<U>) -> Result<()>
where
    S: DataSource + ?Sized + 'static,
    U: Unmarshaller + ?Sized + 'static,
{
    default_configuration().load_from_data_source(source, unmarshaller)
}

/// See [`Configuration::load_environments`].
pub fn load_environments(prefix: &str) -> Result<ChangeSet> {
    default_configuration().load_environments(prefix)
}

/// See [`Configuration::set`].
pub fn set(key: &str, value: impl Into<ConfigValue>) -> Result<()> {
    default_configuration().set(key, value)
}

/// See [`Configuration::get`].
pub fn get(key: &str) -> Option<ConfigValue> {
    default_configuration().get(key)
}

/// See [`Configuration::contains_key`].
pub fn contains_key(key: &str) -> bool {
    default_configuration().contains_key(key)
}

/// See [`Configuration::get_string`].
pub fn get_string(key: &str) -> String {
    default_configuration().get_string(key)
}

/// See [`Configuration::get_bool`].
pub fn get_bool(key: &str) -> bool {
    default_configuration().get_bool(key)
}

/// See [`Configuration::get_int`].
pub fn get_int(key: &str) -> i64 {
    default_configuration().get_int(key)
}

/// See [`Configuration::get_uint`].
pub fn get_uint(key: &str) -> u64 {
    default_configuration().get_uint(key)
}

/// See [`Configuration::get_float64`].
pub fn get_float64(key: &str) -> f64 {
    default_configuration().get_float64(key)
}

/// See [`Configuration::get_duration`].
pub fn get_duration(key: &str) -> Duration {
    default_configuration().get_duration(key)
}

/// See [`Configuration::get_string_slice`].
pub fn get_string_slice(key: &str) -> Vec<String> {
    default_configuration().get_string_slice(key)
}

/// See [`Configuration::get_int_slice`].
pub fn get_int_slice(key: &str) -> Vec<i64> {
    default_configuration().get_int_slice(key)
}

/// See [`Configuration::get_slice`].
pub fn get_slice(key: &str) -> Vec<ConfigValue> {
    default_configuration().get_slice(key)
}

/// See [`Configuration::get_string_map`].
pub fn get_string_map(key: &str) -> ConfigMap {
    default_configuration().get_string_map(key)
}

/// See [`Configuration::get_string_map_string`].
pub fn get_string_map_string(key: &str) -> BTreeMap<String, String> {
    default_configuration().get_string_map_string(key)
}

/// See [`Configuration::get_string_map_string_slice`].
pub fn get_string_map_string_slice(key: &str) -> BTreeMap<String, Vec<String>> {
    default_configuration().get_string_map_string_slice(key)
}

/// See [`Configuration::get_slice_string_map`].
pub fn get_slice_string_map(key: &str) -> Vec<ConfigMap> {
    default_configuration().get_slice_string_map(key)
}

/// See [`Configuration::unmarshal_key`].
pub fn unmarshal_key<T: DeserializeOwned>(key: &str) -> Result<T> {
    default_configuration().unmarshal_key(key)
}

/// See [`Configuration::unmarshal_key_with`].
pub fn unmarshal_key_with<T: DeserializeOwned>(key: &str, options: &GetOptions) -> Result<T> {
    default_configuration().unmarshal_key_with(key, options)
}

/// See [`Configuration::unmarshal_key_or`].
pub fn unmarshal_key_or<T: DeserializeOwned>(key: &str, default: T) -> T {
    default_configuration().unmarshal_key_or(key, default)
}

/// See [`Configuration::on_change`].
pub fn on_change<F>(prefix: impl Into<String>, callback: F)
where
    F: Fn(&Configuration) + Send + Sync + 'static,
{
    default_configuration().on_change(prefix, callback)
}

/// See [`Configuration::traverse`].
pub fn traverse(delimiter: &str) -> FlatMap {
    default_configuration().traverse(delimiter)
}

/// See [`Configuration::debug`].
pub fn debug(delimiter: &str) {
    default_configuration().debug(delimiter)
}

/// See [`Configuration::sub`].
pub fn sub(key: &str) -> Configuration {
    default_configuration().sub(key)
}
