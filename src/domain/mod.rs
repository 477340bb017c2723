// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core types and pure logic.
//!
//! This module contains the value tree, the merge/flatten/diff operations over
//! it, and the error types. It has no knowledge of locking, threads, or where
//! configuration bytes come from.

pub mod config_value;
pub mod duration;
pub mod errors;
pub mod options;
pub mod tree;

// Re-export commonly used types
pub use config_value::{ConfigMap, ConfigValue};
pub use errors::{ConfigError, Result};
pub use options::GetOptions;
pub use tree::{ChangeSet, FlatMap};
