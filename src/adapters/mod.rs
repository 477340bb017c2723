// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing data source and format implementations.
//!
//! This module contains concrete implementations of the ports: payload
//! formats (`Unmarshaller`), data sources (`DataSource`), the scheme registry
//! that builds sources from addresses, and the environment and command-line
//! bootstrap helpers.

#[cfg(feature = "cli")]
pub mod cli;
pub mod env_var;
pub mod file;
pub mod formats;
pub mod memory;
pub mod notifier;
pub mod registry;

// Re-export adapters based on feature flags
#[cfg(feature = "cli")]
pub use cli::ConfigArgs;
pub use env_var::EnvVarAdapter;
pub use file::FileDataSource;
pub use formats::{unmarshaller_for_path, JsonUnmarshaller};
#[cfg(feature = "toml")]
pub use formats::TomlUnmarshaller;
#[cfg(feature = "yaml")]
pub use formats::YamlUnmarshaller;
pub use memory::MemoryDataSource;
pub use notifier::ChangeNotifier;
pub use registry::new_data_source;
