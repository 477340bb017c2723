// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background reload loop binding a data source to a tree.

use crate::domain::Result;
use crate::ports::{DataSource, Unmarshaller};
use crate::service::configuration::Configuration;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Spawns the thread that reloads `source` into `configuration` on every
/// signal received on `changes`.
///
/// Read and decode failures are logged and skipped. The thread ends once the
/// change channel disconnects.
pub(crate) fn spawn_reload_loop<S, U>(
    configuration: Configuration,
    source: Arc<S>,
    unmarshaller: Arc<U>,
    changes: Receiver<()>,
) -> Result<JoinHandle<()>>
where
    S: DataSource + ?Sized + 'static,
    U: Unmarshaller + ?Sized + 'static,
{
    let handle = thread::Builder::new()
        .name(format!("dyncfg-reload-{}", source.name()))
        .spawn(move || {
            while changes.recv().is_ok() {
                let content = match source.read_config() {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::warn!(source = source.name(), error = %e, "failed to read configuration");
                        continue;
                    }
                };
                if let Err(e) = configuration.load(&content, unmarshaller.as_ref()) {
                    tracing::warn!(source = source.name(), error = %e, "failed to reload configuration");
                }
            }
            tracing::debug!(source = source.name(), "configuration source closed, reload loop stopped");
        })?;
    Ok(handle)
}
