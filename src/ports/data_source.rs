// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data source trait definition.
//!
//! This module defines the `DataSource` trait, the port every external origin
//! of configuration bytes implements: a local file, a long-poll HTTP config
//! service, a distributed key-value watch, or an in-process buffer.

use crate::domain::Result;
use std::sync::mpsc::Receiver;

/// A trait for external origins of configuration payloads.
///
/// A data source hands out the full current payload on demand and signals
/// through a channel whenever that payload may have changed. Closing the
/// source ends every change channel it handed out.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the store reads from them on a
/// dedicated reload thread.
///
/// # Examples
///
/// ```rust
/// use dyncfg::domain::Result;
/// use dyncfg::ports::DataSource;
/// use std::sync::mpsc::{channel, Receiver};
///
/// struct Fixed(&'static str);
///
/// impl DataSource for Fixed {
///     fn name(&self) -> &str {
///         "fixed"
///     }
///
///     fn read_config(&self) -> Result<Vec<u8>> {
///         Ok(self.0.as_bytes().to_vec())
///     }
///
///     fn is_config_changed(&self) -> Receiver<()> {
///         // Never changes: the sender is dropped right away.
///         channel().1
///     }
///
///     fn close(&self) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// let source = Fixed("a = 1");
/// assert_eq!(source.read_config().unwrap(), b"a = 1");
/// assert!(source.is_config_changed().recv().is_err());
/// ```
pub trait DataSource: Send + Sync {
    /// Returns a short name of the source for logging and error messages.
    fn name(&self) -> &str;

    /// Fetches the current full configuration payload.
    ///
    /// May block on I/O.
    fn read_config(&self) -> Result<Vec<u8>>;

    /// Returns a channel that receives `()` each time the source detects a
    /// change.
    ///
    /// The channel disconnects once the source is closed or can never change
    /// again.
    fn is_config_changed(&self) -> Receiver<()>;

    /// Releases resources and ends the change notification stream.
    fn close(&self) -> Result<()>;
}
