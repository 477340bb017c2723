// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process data source.

use crate::adapters::notifier::ChangeNotifier;
use crate::domain::{ConfigError, Result};
use crate::ports::DataSource;
use std::sync::mpsc::Receiver;
use std::sync::{PoisonError, RwLock};

/// A data source backed by an in-memory buffer.
///
/// Every call to [`MemoryDataSource::set_content`] replaces the payload and
/// signals subscribers, which makes it a programmatic push channel for
/// configuration as well as a test double for remote sources.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::{JsonUnmarshaller, MemoryDataSource};
/// use dyncfg::ports::DataSource;
/// use dyncfg::service::Configuration;
/// use std::sync::Arc;
///
/// # fn main() -> dyncfg::domain::Result<()> {
/// let source = Arc::new(MemoryDataSource::new(r#"{"level": "info"}"#));
/// let config = Configuration::new();
/// config.load_from_data_source(source.clone(), Arc::new(JsonUnmarshaller))?;
/// assert_eq!(config.get_string("level"), "info");
///
/// source.set_content(r#"{"level": "debug"}"#)?;
/// source.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryDataSource {
    content: RwLock<Vec<u8>>,
    notifier: ChangeNotifier,
}

impl MemoryDataSource {
    /// Creates a source holding `content`.
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: RwLock::new(content.into()),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Replaces the payload and signals every subscriber.
    ///
    /// Fails once the source has been closed.
    pub fn set_content(&self, content: impl Into<Vec<u8>>) -> Result<()> {
        if self.notifier.is_closed() {
            return Err(ConfigError::SourceError {
                source_name: self.name().to_string(),
                message: "source is closed".to_string(),
                source: None,
            });
        }
        *self.content.write().unwrap_or_else(PoisonError::into_inner) = content.into();
        self.notifier.notify();
        Ok(())
    }
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DataSource for MemoryDataSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn read_config(&self) -> Result<Vec<u8>> {
        Ok(self
            .content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn is_config_changed(&self) -> Receiver<()> {
        self.notifier.subscribe()
    }

    fn close(&self) -> Result<()> {
        self.notifier.close();
        Ok(())
    }
}
