// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide node status read by status and health reporters

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwapOption;
use tracing::warn;

/// The most recent runtime fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFault {
    pub message: String,
    pub recorded_at: SystemTime,
}

/// Transient node status
pub struct NodeState {
    start_time: SystemTime,
    loading: AtomicBool,
    fault: ArcSwapOption<StoredFault>,
    client_id_sequence: AtomicI64,
}

impl NodeState {
    pub fn new() -> Self {
        Self {
            start_time: SystemTime::now(),
            loading: AtomicBool::new(false),
            fault: ArcSwapOption::empty(),
            client_id_sequence: AtomicI64::new(0),
        }
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed().unwrap_or_default()
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Keep `fault` as the latest fault, replacing any earlier one
    pub fn store_fault(&self, fault: impl fmt::Display) {
        let message = fault.to_string();
        warn!(fault = %message, "storing runtime fault");
        self.fault.store(Some(Arc::new(StoredFault {
            message,
            recorded_at: SystemTime::now(),
        })));
    }

    pub fn clear_fault(&self) {
        self.fault.store(None);
    }

    /// Clear the stored fault only if `matches` accepts it. A fault stored
    /// concurrently after the check is kept.
    pub fn clear_fault_if(&self, matches: impl Fn(&StoredFault) -> bool) -> bool {
        let current = self.fault.load_full();
        match &current {
            Some(fault) if matches(fault) => {
                let prev = self.fault.compare_and_swap(&current, None);
                match (&*prev, &current) {
                    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    pub fn last_fault(&self) -> Option<Arc<StoredFault>> {
        self.fault.load_full()
    }

    pub fn is_healthy(&self) -> bool {
        self.fault.load().is_none()
    }

    /// `OK`, or `NOK - <fault>` while a fault is stored
    pub fn health(&self) -> String {
        let fault = self.fault.load();
        match &*fault {
            None => "OK".to_string(),
            Some(fault) => format!("NOK - {}", fault.message),
        }
    }

    /// Next client identifier, starting at 1
    pub fn next_client_id(&self) -> i64 {
        self.client_id_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeState")
            .field("start_time", &self.start_time)
            .field("loading", &self.is_loading())
            .field("health", &self.health())
            .finish()
    }
}
