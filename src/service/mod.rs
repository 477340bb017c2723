// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the configuration store.
//!
//! This module contains `Configuration`, the concurrent tree every consumer
//! reads from, the dispatcher that notifies prefix watchers, the reload loop
//! binding data sources to a tree, and the process-wide default instance.

pub mod configuration;
pub mod dispatcher;
pub mod global;
mod reload;

// Re-export commonly used types
pub use configuration::{Configuration, DEFAULT_KEY_DELIMITER};
pub use dispatcher::{ChangeCallback, WatcherDispatcher};
