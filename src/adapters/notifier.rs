// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out change signal shared by data sources.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// Hands out change channels and signals all of them at once.
///
/// Closing the notifier drops every sender, which disconnects all receivers.
/// Subscribing after close yields an already disconnected receiver.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::ChangeNotifier;
///
/// let notifier = ChangeNotifier::new();
/// let changes = notifier.subscribe();
///
/// notifier.notify();
/// assert!(changes.try_recv().is_ok());
///
/// notifier.close();
/// assert!(changes.recv().is_err());
/// ```
#[derive(Debug)]
pub struct ChangeNotifier {
    /// `None` once closed
    senders: Mutex<Option<Vec<Sender<()>>>>,
}

impl ChangeNotifier {
    /// Creates an open notifier with no subscribers.
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Some(Vec::new())),
        }
    }

    /// Returns a new receiver that gets `()` on every [`ChangeNotifier::notify`].
    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = channel();
        if let Some(senders) = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            senders.push(tx);
        }
        rx
    }

    /// Signals every live subscriber, forgetting the ones that hung up.
    pub fn notify(&self) {
        if let Some(senders) = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            senders.retain(|tx| tx.send(()).is_ok());
        }
    }

    /// Disconnects every subscriber. Idempotent.
    pub fn close(&self) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Returns `true` once [`ChangeNotifier::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
