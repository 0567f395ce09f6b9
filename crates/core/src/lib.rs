// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nq-core: process-local coordination for the nq broker daemon
//!
//! This crate provides:
//! - An exclusive lock on the data directory
//! - A lock-free, hot-swappable configuration store with coalescing reload
//!   notifications
//! - A buffered message ID generator
//! - The topic registry
//! - The node controller tying startup and shutdown together

pub mod config_store;
pub mod dirlock;
pub mod logger;
pub mod message_id;
pub mod node;
pub mod options;
pub mod registry;
pub mod state;
pub mod topic;

// Re-exports
pub use config_store::ConfigStore;
pub use dirlock::{DirLock, DirLockError, LockHandle};
pub use logger::{Logger, SharedLogger, TracingLogger};
pub use message_id::{IdError, IdSource, MessageId, ID_BUFFER_CAPACITY, MSG_ID_LENGTH};
pub use node::{Node, NodeError, NodePhase};
pub use options::{ConfigError, Options, LOG_LEVELS, MAX_WORKER_ID};
pub use registry::{RegistryError, TopicRegistry};
pub use state::{NodeState, StoredFault};
pub use topic::{is_valid_topic_name, Topic};
