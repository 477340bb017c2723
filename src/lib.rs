// SPDX-License-Identifier: MIT OR Apache-2.0

//! A dynamic, hierarchical configuration crate.
//!
//! This crate keeps a merged tree of configuration loaded from pluggable data
//! sources, works out which keys changed on every reload, and notifies
//! subscribers registered on key prefixes.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: The value tree, merge/flatten/diff, errors, durations
//! - **Ports**: Trait definitions at the edges (`DataSource`, `Unmarshaller`)
//! - **Adapters**: Files, in-memory sources, formats, env vars, CLI flags
//! - **Service**: The `Configuration` store, watcher dispatch, reload loops and
//!   the process-wide default instance
//!
//! # Features
//!
//! - **Deep Merge**: Later payloads override earlier ones key by key
//! - **Change Detection**: Each update reports exactly the flat keys it touched
//! - **Scoped Watchers**: Callbacks fire only for changes under their prefix
//! - **Hot Reload**: Data sources push change signals and are re-read
//! - **Typed Access**: Lenient getters plus serde-based `unmarshal_key`
//!
//! # Feature Flags
//!
//! - `yaml`: Enable YAML payloads (default)
//! - `toml`: Enable TOML payloads (default)
//! - `cli`: Enable the clap bootstrap flags (default)
//! - `reload`: Enable file watching with `notify`
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use dyncfg::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let source = Arc::new(MemoryDataSource::new(r#"{"server": {"http": {"addr": ":8080"}}}"#));
//! let config = Configuration::new();
//! config.load_from_data_source(source.clone(), Arc::new(JsonUnmarshaller))?;
//!
//! config.on_change("server.http", |c| {
//!     println!("new address: {}", c.get_string("server.http.addr"));
//! });
//!
//! assert_eq!(config.get_string("server.http.addr"), ":8080");
//! source.set_content(r#"{"server": {"http": {"addr": ":9090"}}}"#)?;
//! source.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! The free functions at the crate root ([`get_string`], [`on_change`],
//! [`load`], ...) operate on a process-wide default instance.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::duration;
pub use service::global::*;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        ChangeSet, ConfigError, ConfigMap, ConfigValue, FlatMap, GetOptions, Result,
    };
    pub use crate::ports::{DataSource, Unmarshaller};
    pub use crate::service::Configuration;

    pub use crate::adapters::{
        unmarshaller_for_path, FileDataSource, JsonUnmarshaller, MemoryDataSource,
    };

    // Re-export adapters based on feature flags
    #[cfg(feature = "cli")]
    pub use crate::adapters::ConfigArgs;
    #[cfg(feature = "toml")]
    pub use crate::adapters::TomlUnmarshaller;
    #[cfg(feature = "yaml")]
    pub use crate::adapters::YamlUnmarshaller;
}
