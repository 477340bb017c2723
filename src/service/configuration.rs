// SPDX-License-Identifier: MIT OR Apache-2.0

//! The configuration store.
//!
//! This module provides `Configuration`, a cheaply clonable handle to a
//! merged configuration tree. Every update (a decoded payload, a single `set`,
//! a batch of environment variables) goes through one write path that merges,
//! flattens, computes the changed keys and rebuilds the flat-key cache inside a
//! single critical section. Watchers are notified after the lock is released.

use crate::adapters::env_var::EnvVarAdapter;
use crate::domain::tree::{self, diff, flatten, lookup, merge};
use crate::domain::{ChangeSet, ConfigError, ConfigMap, ConfigValue, FlatMap, GetOptions, Result};
use crate::ports::{DataSource, Unmarshaller};
use crate::service::dispatcher::WatcherDispatcher;
use crate::service::reload;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Delimiter used between key segments unless configured otherwise.
pub const DEFAULT_KEY_DELIMITER: &str = ".";

#[derive(Default)]
struct TreeState {
    /// Fully merged nested tree
    root: ConfigMap,
    /// Flat view of `root` as of the last update
    flat: FlatMap,
}

struct Inner {
    key_delimiter: String,
    state: RwLock<TreeState>,
    /// Resolved lookups, including lookups that resolved to nothing
    key_map: DashMap<String, Option<ConfigValue>>,
    dispatcher: WatcherDispatcher,
}

/// A dynamic, hierarchical configuration tree.
///
/// Cloning a `Configuration` yields another handle to the same tree; watchers
/// registered through any handle see updates made through every other.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::JsonUnmarshaller;
/// use dyncfg::service::Configuration;
///
/// # fn main() -> dyncfg::domain::Result<()> {
/// let config = Configuration::new();
/// config.load(br#"{"server": {"http": {"port": 8080}}}"#, &JsonUnmarshaller)?;
///
/// assert_eq!(config.get_int("server.http.port"), 8080);
/// assert_eq!(config.get_string("server.http.port"), "8080");
/// assert_eq!(config.get_string("server.missing"), "");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Configuration {
    inner: Arc<Inner>,
}

impl Configuration {
    /// Creates an empty tree using the `"."` key delimiter.
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_KEY_DELIMITER)
    }

    /// Creates an empty tree using a custom key delimiter.
    ///
    /// An empty delimiter falls back to `"."`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dyncfg::service::Configuration;
    ///
    /// let config = Configuration::with_delimiter("/");
    /// config.set("server/port", 8080).unwrap();
    /// assert_eq!(config.get_int("server/port"), 8080);
    /// ```
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let mut key_delimiter = delimiter.into();
        if key_delimiter.is_empty() {
            key_delimiter = DEFAULT_KEY_DELIMITER.to_string();
        }
        Self {
            inner: Arc::new(Inner {
                dispatcher: WatcherDispatcher::new(key_delimiter.clone()),
                key_delimiter,
                state: RwLock::new(TreeState::default()),
                key_map: DashMap::new(),
            }),
        }
    }

    fn from_map(root: ConfigMap, delimiter: &str) -> Self {
        let configuration = Self::with_delimiter(delimiter);
        {
            let mut state = configuration.write_state();
            state.flat = flatten(&root, &configuration.inner.key_delimiter);
            state.root = root;
            configuration.rebuild_key_map(&state.flat);
        }
        configuration
    }

    /// Returns the delimiter separating key segments.
    pub fn key_delimiter(&self) -> &str {
        &self.inner.key_delimiter
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TreeState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TreeState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn rebuild_key_map(&self, flat: &FlatMap) {
        self.inner.key_map.clear();
        for (key, value) in flat {
            self.inner.key_map.insert(key.clone(), Some(value.clone()));
        }
    }

    /// Runs `mutate` on the root and publishes the result.
    ///
    /// Must not be called while holding the state lock.
    fn update<F>(&self, mutate: F) -> ChangeSet
    where
        F: FnOnce(&mut ConfigMap),
    {
        let changes = {
            let mut state = self.write_state();
            mutate(&mut state.root);
            let flat = flatten(&state.root, &self.inner.key_delimiter);
            let changes = diff(&state.flat, &flat);
            self.rebuild_key_map(&flat);
            state.flat = flat;
            changes
        };

        tracing::debug!(changed = changes.len(), "applied configuration update");
        if !changes.is_empty() {
            self.inner.dispatcher.dispatch(&changes, self);
        }
        changes
    }

    /// Merges `incoming` into the tree and notifies affected watchers.
    ///
    /// Returns the flat keys whose value was added, modified or removed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dyncfg::domain::{ConfigMap, ConfigValue};
    /// use dyncfg::service::Configuration;
    ///
    /// let config = Configuration::new();
    /// let mut incoming = ConfigMap::new();
    /// incoming.insert("name".to_string(), ConfigValue::from("demo"));
    ///
    /// let changes = config.apply(incoming.clone()).unwrap();
    /// assert!(changes.contains("name"));
    /// assert!(config.apply(incoming).unwrap().is_empty());
    /// ```
    pub fn apply(&self, incoming: ConfigMap) -> Result<ChangeSet> {
        Ok(self.update(|root| merge(root, incoming)))
    }

    /// Decodes `content` with `unmarshaller` and applies the result.
    ///
    /// A decode failure is returned and leaves the tree untouched.
    pub fn load<U>(&self, content: &[u8], unmarshaller: &U) -> Result<()>
    where
        U: Unmarshaller + ?Sized,
    {
        let incoming = unmarshaller.unmarshal(content)?;
        self.apply(incoming)?;
        Ok(())
    }

    /// Reads `reader` to the end, then behaves like [`Configuration::load`].
    pub fn load_from_reader<R, U>(&self, mut reader: R, unmarshaller: &U) -> Result<()>
    where
        R: Read,
        U: Unmarshaller + ?Sized,
    {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        self.load(&content, unmarshaller)
    }

    /// Binds a data source to this tree.
    ///
    /// The current payload is read and loaded synchronously; a failure there
    /// is returned and no reload loop is started. Afterwards a background
    /// thread reloads the payload on every change signal until the source
    /// closes its change channel. Reload failures are logged and the last
    /// good state is kept.
    pub fn load_from_data_source<S, U>(&self, source: Arc<S>, unmarshaller: Arc<U>) -> Result<()>
    where
        S: DataSource + ?Sized + 'static,
        U: Unmarshaller + ?Sized + 'static,
    {
        // Subscribe first so a change between the read and the spawn is not lost.
        let changes = source.is_config_changed();
        let content = source.read_config()?;
        self.load(&content, unmarshaller.as_ref())?;
        tracing::info!(source = source.name(), "loaded configuration from data source");

        reload::spawn_reload_loop(self.clone(), source, unmarshaller, changes)?;
        Ok(())
    }

    /// Applies every environment variable starting with `prefix`.
    ///
    /// The prefix is stripped, the rest lowercased and `_` replaced by the key
    /// delimiter, so with prefix `APP_` the variable `APP_SERVER_PORT` sets
    /// `server.port`. Values are stored as strings.
    pub fn load_environments(&self, prefix: &str) -> Result<ChangeSet> {
        let adapter = EnvVarAdapter::with_prefix(prefix)
            .lowercase_keys(true)
            .delimiter(self.key_delimiter());
        self.apply_flat(
            adapter
                .collect()
                .into_iter()
                .map(|(key, value)| (key, ConfigValue::from(value))),
        )
    }

    /// Applies flat `(key, value)` pairs as one update.
    pub(crate) fn apply_flat<I>(&self, entries: I) -> Result<ChangeSet>
    where
        I: IntoIterator<Item = (String, ConfigValue)>,
    {
        self.apply(tree::unflatten(entries, self.key_delimiter()))
    }

    /// Stores `value` at `key`, creating intermediate maps as needed.
    ///
    /// The empty key addresses the root, which only accepts a map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dyncfg::service::Configuration;
    ///
    /// let config = Configuration::new();
    /// config.set("server.http.port", 8080).unwrap();
    /// assert_eq!(config.get_int("server.http.port"), 8080);
    /// assert!(config.contains_key("server.http"));
    /// ```
    pub fn set(&self, key: &str, value: impl Into<ConfigValue>) -> Result<()> {
        let value = value.into();
        if key.is_empty() {
            return match value {
                ConfigValue::Map(map) => self.apply(map).map(|_| ()),
                other => Err(ConfigError::shape_mismatch(key, "map", other.kind())),
            };
        }

        self.update(|root| tree::assign(root, key, &self.inner.key_delimiter, value));
        Ok(())
    }

    /// Resolves `key` to its value, if any.
    ///
    /// Interior keys resolve to their subtree as a map.
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let state = self.read_state();
        if let Some(cached) = self.inner.key_map.get(key) {
            return cached.value().clone();
        }

        let resolved = lookup(&state.root, key, &self.inner.key_delimiter).cloned();
        self.inner.key_map.insert(key.to_string(), resolved.clone());
        resolved
    }

    /// Returns `true` if `key` resolves to a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn lenient<T, F>(&self, key: &str, convert: F) -> T
    where
        T: Default,
        F: FnOnce(&ConfigValue, &str) -> Result<T>,
    {
        let Some(value) = self.get(key) else {
            return T::default();
        };
        convert(&value, key).unwrap_or_else(|e| {
            tracing::trace!(key, error = %e, "conversion failed, using zero value");
            T::default()
        })
    }

    /// Returns the value at `key` as a string, or `""`.
    pub fn get_string(&self, key: &str) -> String {
        self.lenient(key, ConfigValue::as_string)
    }

    /// Returns the value at `key` as a boolean, or `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.lenient(key, ConfigValue::as_bool)
    }

    /// Returns the value at `key` as a signed integer, or `0`.
    pub fn get_int(&self, key: &str) -> i64 {
        self.lenient(key, ConfigValue::as_i64)
    }

    /// Returns the value at `key` as an unsigned integer, or `0`.
    pub fn get_uint(&self, key: &str) -> u64 {
        self.lenient(key, ConfigValue::as_u64)
    }

    /// Returns the value at `key` as a float, or `0.0`.
    pub fn get_float64(&self, key: &str) -> f64 {
        self.lenient(key, ConfigValue::as_f64)
    }

    /// Returns the value at `key` as a duration, or zero.
    ///
    /// Strings such as `"1s"` or `"250ms"` are parsed; bare numbers are
    /// nanoseconds.
    pub fn get_duration(&self, key: &str) -> Duration {
        self.lenient(key, ConfigValue::as_duration)
    }

    /// Returns the value at `key` as a list of strings, or an empty list.
    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.lenient(key, ConfigValue::as_string_slice)
    }

    /// Returns the value at `key` as a list of integers, or an empty list.
    pub fn get_int_slice(&self, key: &str) -> Vec<i64> {
        self.lenient(key, ConfigValue::as_i64_slice)
    }

    /// Returns the value at `key` as a list of values, or an empty list.
    pub fn get_slice(&self, key: &str) -> Vec<ConfigValue> {
        self.lenient(key, ConfigValue::as_sequence)
    }

    /// Returns the subtree at `key`, or an empty map.
    pub fn get_string_map(&self, key: &str) -> ConfigMap {
        self.lenient(key, ConfigValue::as_map)
    }

    /// Returns the subtree at `key` with every value as a string.
    pub fn get_string_map_string(&self, key: &str) -> BTreeMap<String, String> {
        self.lenient(key, ConfigValue::as_string_map_string)
    }

    /// Returns the subtree at `key` with every value as a list of strings.
    pub fn get_string_map_string_slice(&self, key: &str) -> BTreeMap<String, Vec<String>> {
        self.lenient(key, ConfigValue::as_string_map_string_slice)
    }

    /// Returns the value at `key` as a list of maps, or an empty list.
    pub fn get_slice_string_map(&self, key: &str) -> Vec<ConfigMap> {
        self.lenient(key, ConfigValue::as_map_slice)
    }

    /// Decodes the value at `key` into `T`.
    ///
    /// The empty key decodes the whole tree. A key resolving to nothing is a
    /// [`ConfigError::KeyNotFound`]; a value of the wrong shape is a
    /// [`ConfigError::Decode`].
    ///
    /// On an empty tree the empty key decodes an empty map, so a target whose
    /// fields all have serde defaults comes back at its default value, while a
    /// required field without one yields [`ConfigError::Decode`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dyncfg::adapters::JsonUnmarshaller;
    /// use dyncfg::service::Configuration;
    /// use serde::Deserialize;
    /// use std::time::Duration;
    ///
    /// #[derive(Debug, Deserialize)]
    /// struct Http {
    ///     addr: String,
    ///     #[serde(with = "dyncfg::duration")]
    ///     timeout: Duration,
    /// }
    ///
    /// # fn main() -> dyncfg::domain::Result<()> {
    /// let config = Configuration::new();
    /// config.load(
    ///     br#"{"server": {"http": {"addr": ":8080", "timeout": "1s"}}}"#,
    ///     &JsonUnmarshaller,
    /// )?;
    ///
    /// let http: Http = config.unmarshal_key("server.http")?;
    /// assert_eq!(http.addr, ":8080");
    /// assert_eq!(http.timeout, Duration::from_secs(1));
    /// assert!(config.unmarshal_key::<Http>("client.http").unwrap_err().is_key_not_found());
    /// # Ok(())
    /// # }
    /// ```
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.unmarshal_key_with(key, &GetOptions::default())
    }

    /// Decodes the value at `key`, scoped by `options`, into `T`.
    pub fn unmarshal_key_with<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &GetOptions,
    ) -> Result<T> {
        let key = options.scoped_key(key, self.key_delimiter());
        let value = if key.is_empty() {
            ConfigValue::Map(self.read_state().root.clone())
        } else {
            match self.get(&key) {
                Some(value) if !value.is_null() => value,
                _ => return Err(ConfigError::KeyNotFound { key }),
            }
        };

        let intermediate = serde_json::to_value(&value).map_err(|source| ConfigError::Decode {
            key: key.clone(),
            source,
        })?;
        serde_json::from_value(intermediate).map_err(|source| ConfigError::Decode { key, source })
    }

    /// Decodes the value at `key` into `T`, falling back to `default` on any
    /// error.
    pub fn unmarshal_key_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.unmarshal_key(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::trace!(key, error = %e, "decode failed, using default");
                default
            }
        }
    }

    /// Registers `callback` to run whenever a key under `prefix` changes.
    ///
    /// The empty prefix watches every key. Registrations live as long as the
    /// tree.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dyncfg::service::Configuration;
    /// use std::sync::mpsc::channel;
    /// use std::time::Duration;
    ///
    /// let config = Configuration::new();
    /// let (tx, rx) = channel();
    /// config.on_change("people", move |c| {
    ///     let _ = tx.send(c.get_string("people.name"));
    /// });
    ///
    /// config.set("people.name", "Bob").unwrap();
    /// assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "Bob");
    /// ```
    pub fn on_change<F>(&self, prefix: impl Into<String>, callback: F)
    where
        F: Fn(&Configuration) + Send + Sync + 'static,
    {
        self.inner.dispatcher.register(prefix, Arc::new(callback));
    }

    /// Returns every leaf of the tree keyed by its path joined with
    /// `delimiter`.
    pub fn traverse(&self, delimiter: &str) -> FlatMap {
        flatten(&self.read_state().root, delimiter)
    }

    /// Logs every leaf of the tree at debug level.
    pub fn debug(&self, delimiter: &str) {
        for (key, value) in self.traverse(delimiter) {
            tracing::debug!(key = %key, value = %value, "configuration entry");
        }
    }

    /// Returns a detached tree rooted at the subtree under `key`.
    ///
    /// The new tree shares no state or watchers with this one; a missing or
    /// non-map key yields an empty tree.
    pub fn sub(&self, key: &str) -> Configuration {
        let root = match self.get(key) {
            Some(ConfigValue::Map(map)) => map,
            _ => ConfigMap::new(),
        };
        Self::from_map(root, self.key_delimiter())
    }

    /// Discards every value and cached lookup.
    ///
    /// Watchers stay registered and are not notified.
    pub fn reset(&self) {
        let mut state = self.write_state();
        *state = TreeState::default();
        self.inner.key_map.clear();
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("key_delimiter", &self.inner.key_delimiter)
            .field("keys", &self.read_state().flat.len())
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}
