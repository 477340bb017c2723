// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prefix-scoped change notification.
//!
//! The dispatcher keeps watch registrations keyed by prefix and, given the set
//! of flat keys changed by an update, runs the callbacks of every prefix that
//! covers at least one of them.

use crate::domain::tree::prefix_matches;
use crate::domain::ChangeSet;
use crate::service::configuration::Configuration;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

/// Type alias for change notification callbacks.
///
/// The callback receives the tree after the update, so it can re-read the
/// values it cares about.
pub type ChangeCallback = Arc<dyn Fn(&Configuration) + Send + Sync>;

/// Registry of watch callbacks keyed by prefix.
///
/// Every callback runs on a thread of its own. Threads are spawned in
/// registration order, but nothing orders their completion. Dispatch never
/// waits for callbacks to finish.
pub struct WatcherDispatcher {
    delimiter: String,
    watchers: RwLock<HashMap<String, Vec<ChangeCallback>>>,
}

impl WatcherDispatcher {
    /// Creates an empty dispatcher matching prefixes on `delimiter` boundaries.
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            watchers: RwLock::new(HashMap::new()),
        }
    }

    /// Appends `callback` to the list registered under `prefix`.
    pub fn register(&self, prefix: impl Into<String>, callback: ChangeCallback) {
        self.watchers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(prefix.into())
            .or_default()
            .push(callback);
    }

    /// Returns the total number of registered callbacks.
    pub fn len(&self) -> usize {
        self.watchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Returns `true` if no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the registered prefixes covering at least one changed key,
    /// sorted.
    pub fn affected_prefixes(&self, changes: &ChangeSet) -> Vec<String> {
        let watchers = self.watchers.read().unwrap_or_else(PoisonError::into_inner);
        let mut affected: Vec<String> = self
            .affected(&watchers, changes)
            .map(|(prefix, _)| prefix.clone())
            .collect();
        affected.sort();
        affected
    }

    /// Runs every callback of every affected prefix, fire-and-forget.
    ///
    /// Each callback gets a thread of its own, spawned in registration order,
    /// so a slow callback never delays another.
    pub fn dispatch(&self, changes: &ChangeSet, configuration: &Configuration) {
        let batches: Vec<(String, Vec<ChangeCallback>)> = {
            let watchers = self.watchers.read().unwrap_or_else(PoisonError::into_inner);
            self.affected(&watchers, changes)
                .map(|(prefix, callbacks)| (prefix.clone(), callbacks.clone()))
                .collect()
        };

        for (prefix, callbacks) in batches {
            tracing::trace!(prefix = %prefix, callbacks = callbacks.len(), "dispatching configuration change");
            for callback in callbacks {
                let configuration = configuration.clone();
                let prefix = prefix.clone();
                let spawned = thread::Builder::new()
                    .name("dyncfg-watch".to_string())
                    .spawn(move || {
                        let outcome =
                            panic::catch_unwind(AssertUnwindSafe(|| callback(&configuration)));
                        if outcome.is_err() {
                            tracing::warn!(prefix = %prefix, "configuration watcher panicked");
                        }
                    });
                if let Err(e) = spawned {
                    tracing::warn!(error = %e, "failed to spawn configuration watcher thread");
                }
            }
        }
    }

    fn affected<'a>(
        &'a self,
        watchers: &'a HashMap<String, Vec<ChangeCallback>>,
        changes: &'a ChangeSet,
    ) -> impl Iterator<Item = (&'a String, &'a Vec<ChangeCallback>)> + 'a {
        watchers.iter().filter(move |(prefix, _)| {
            changes
                .iter()
                .any(|key| prefix_matches(prefix, key, &self.delimiter))
        })
    }
}

impl std::fmt::Debug for WatcherDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherDispatcher")
            .field("delimiter", &self.delimiter)
            .field("callbacks", &self.len())
            .finish()
    }
}
