// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) through which the store
//! talks to the outside world: where configuration bytes come from and how
//! they are decoded. Adapters in the adapters layer implement them.

pub mod data_source;
pub mod unmarshaller;

// Re-export commonly used types
pub use data_source::DataSource;
pub use unmarshaller::Unmarshaller;
