// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-swappable configuration
//!
//! Readers load the current snapshot without locking. Writers publish a
//! whole new snapshot; nothing is ever edited in place.
//!
//! Each `replace` posts a reload signal with room for one pending
//! notification. Posts made while one is already pending are dropped, so a
//! burst of replacements wakes a waiter once. The signal only says "re-check";
//! callers that need every change must diff `current()` themselves.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Notify;
use tracing::debug;

use crate::options::Options;

/// Holds the published configuration snapshot
pub struct ConfigStore {
    current: ArcSwap<Options>,
    reload: Notify,
}

impl ConfigStore {
    /// Create a store publishing `initial`. No reload is pending.
    pub fn new(initial: Options) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            reload: Notify::new(),
        }
    }

    /// The latest published snapshot. Lock-free.
    pub fn current(&self) -> Arc<Options> {
        self.current.load_full()
    }

    /// Publish a new snapshot and post a reload notification.
    ///
    /// The snapshot must already be validated.
    pub fn replace(&self, next: Options) {
        self.current.store(Arc::new(next));
        // Stores at most one permit when nobody is waiting
        self.reload.notify_one();
        debug!("configuration snapshot replaced");
    }

    /// Wait until a reload notification is posted, consuming it
    pub async fn await_reload(&self) {
        self.reload.notified().await;
    }

    /// Write a diagnostic through the current snapshot's logger
    pub fn logf(&self, args: fmt::Arguments<'_>) {
        self.current.load().logf(args);
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("current", &self.current.load())
            .finish()
    }
}

#[cfg(test)]
#[path = "config_store_tests.rs"]
mod tests;
