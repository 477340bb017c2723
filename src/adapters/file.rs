// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local file data source.
//!
//! This module provides a data source that reads a configuration file from
//! disk and, with the `reload` feature, watches it for modifications.

use crate::adapters::notifier::ChangeNotifier;
use crate::domain::{ConfigError, Result};
use crate::ports::DataSource;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "reload")]
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
#[cfg(feature = "reload")]
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
#[cfg(feature = "reload")]
use std::sync::{Mutex, PoisonError};
#[cfg(feature = "reload")]
use std::thread::{self, JoinHandle};
#[cfg(feature = "reload")]
use std::time::Instant;

/// Maximum allowed size for configuration files (10MB)
const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default quiet period after the last file event before a change is signalled
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

const SOURCE_NAME: &str = "file";

fn display_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
}

/// Data source reading a configuration file.
///
/// The path is canonicalized up front, so the file must exist when the source
/// is created. When watching is requested (feature `reload`), the parent
/// directory is monitored and every debounced modification of the file
/// signals the change channel.
///
/// # Examples
///
/// ```rust,no_run
/// use dyncfg::adapters::{unmarshaller_for_path, FileDataSource};
/// use dyncfg::service::Configuration;
/// use std::sync::Arc;
///
/// # fn main() -> dyncfg::domain::Result<()> {
/// let source = Arc::new(FileDataSource::new("/etc/myapp/config.toml", true)?);
/// let config = Configuration::new();
/// config.load_from_data_source(source, unmarshaller_for_path("/etc/myapp/config.toml")?)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileDataSource {
    /// Canonical path of the file
    path: PathBuf,
    notifier: Arc<ChangeNotifier>,
    #[cfg(feature = "reload")]
    watch: Mutex<Option<FileWatch>>,
}

impl FileDataSource {
    /// Creates a source for the file at `path`.
    ///
    /// `watch` enables change signalling; it has no effect unless the crate
    /// is built with the `reload` feature.
    pub fn new(path: impl AsRef<Path>, watch: bool) -> Result<Self> {
        Self::with_debounce(path, watch, DEFAULT_DEBOUNCE_DELAY)
    }

    /// Like [`FileDataSource::new`] with a custom debounce delay.
    pub fn with_debounce(path: impl AsRef<Path>, watch: bool, debounce: Duration) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = path.canonicalize().map_err(|e| ConfigError::SourceError {
            source_name: SOURCE_NAME.to_string(),
            message: format!("Invalid or inaccessible path: {}", display_name(path)),
            source: Some(Box::new(e)),
        })?;

        let source = Self {
            path: canonical_path,
            notifier: Arc::new(ChangeNotifier::new()),
            #[cfg(feature = "reload")]
            watch: Mutex::new(None),
        };

        if watch {
            source.start_watching(debounce)?;
        }
        Ok(source)
    }

    /// Creates a source for `file_name` in the OS configuration directory of
    /// the application.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use dyncfg::adapters::FileDataSource;
    ///
    /// let source = FileDataSource::from_default_location("myapp", "com.example", "config.toml", false);
    /// ```
    pub fn from_default_location(
        app_name: &str,
        qualifier: &str,
        file_name: &str,
        watch: bool,
    ) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| ConfigError::SourceError {
                source_name: SOURCE_NAME.to_string(),
                message: "Failed to determine project directories".to_string(),
                source: None,
            })?;

        Self::new(proj_dirs.config_dir().join(file_name), watch)
    }

    /// Returns the canonical path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(not(feature = "reload"))]
    fn start_watching(&self, _debounce: Duration) -> Result<()> {
        tracing::warn!(
            file = display_name(&self.path),
            "file watching requested but the `reload` feature is disabled"
        );
        Ok(())
    }

    #[cfg(feature = "reload")]
    fn start_watching(&self, debounce: Duration) -> Result<()> {
        let watch = FileWatch::start(self.path.clone(), debounce, Arc::clone(&self.notifier))?;
        *self.watch.lock().unwrap_or_else(PoisonError::into_inner) = Some(watch);
        Ok(())
    }

    #[cfg(not(feature = "reload"))]
    fn stop_watching(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(feature = "reload")]
    fn stop_watching(&self) -> Result<()> {
        let watch = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match watch {
            Some(watch) => watch.stop(),
            None => Ok(()),
        }
    }
}

impl DataSource for FileDataSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn read_config(&self) -> Result<Vec<u8>> {
        let metadata = fs::metadata(&self.path).map_err(|e| ConfigError::SourceError {
            source_name: SOURCE_NAME.to_string(),
            message: format!(
                "Failed to read file metadata: {}",
                display_name(&self.path)
            ),
            source: Some(Box::new(e)),
        })?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::SourceError {
                source_name: SOURCE_NAME.to_string(),
                message: format!(
                    "Configuration file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
                source: None,
            });
        }

        fs::read(&self.path).map_err(|e| ConfigError::SourceError {
            source_name: SOURCE_NAME.to_string(),
            message: format!(
                "Failed to read configuration file: {}",
                display_name(&self.path)
            ),
            source: Some(Box::new(e)),
        })
    }

    fn is_config_changed(&self) -> Receiver<()> {
        self.notifier.subscribe()
    }

    fn close(&self) -> Result<()> {
        let stopped = self.stop_watching();
        self.notifier.close();
        stopped
    }
}

impl Drop for FileDataSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// A running watch of one file.
#[cfg(feature = "reload")]
struct FileWatch {
    /// Kept alive for the duration of the watch
    _watcher: RecommendedWatcher,
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

#[cfg(feature = "reload")]
impl std::fmt::Debug for FileWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatch")
            .field("thread", &self.thread.thread().name())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "reload")]
impl FileWatch {
    fn start(file_path: PathBuf, debounce: Duration, notifier: Arc<ChangeNotifier>) -> Result<Self> {
        let (event_tx, event_rx) = channel::<notify::Result<Event>>();
        let (stop_tx, stop_rx) = channel::<()>();

        let mut watcher =
            RecommendedWatcher::new(event_tx, notify::Config::default()).map_err(|e| {
                ConfigError::WatcherError {
                    message: format!("Failed to create file watcher: {}", e),
                    source: Some(Box::new(e)),
                }
            })?;

        // Editors often replace files, so watch the parent directory.
        let watch_path = file_path
            .parent()
            .ok_or_else(|| ConfigError::WatcherError {
                message: "Failed to get parent directory".to_string(),
                source: None,
            })?
            .to_path_buf();

        watcher
            .watch(&watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatcherError {
                message: format!("Failed to start watching: {}", e),
                source: Some(Box::new(e)),
            })?;

        let thread = thread::Builder::new()
            .name("dyncfg-file-watch".to_string())
            .spawn(move || {
                // Signal once the file has been quiet for `debounce`.
                let mut last_event: Option<Instant> = None;
                loop {
                    if stop_rx.try_recv().is_ok() {
                        break;
                    }

                    match event_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(Ok(event)) => {
                            if event.paths.iter().any(|p| p == &file_path) {
                                last_event = Some(Instant::now());
                            }
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "file watcher reported an error");
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    if last_event.is_some_and(|at| at.elapsed() >= debounce) {
                        last_event = None;
                        tracing::debug!(file = display_name(&file_path), "configuration file changed");
                        notifier.notify();
                    }
                }
            })?;

        Ok(Self {
            _watcher: watcher,
            stop_tx,
            thread,
        })
    }

    fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(());
        self.thread.join().map_err(|_| ConfigError::WatcherError {
            message: "Failed to join watcher thread".to_string(),
            source: None,
        })
    }
}
