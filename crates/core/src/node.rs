// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node controller: startup ordering and coordinated shutdown
//!
//! ```text
//! Created → Validating → LockAcquired → Running → ShuttingDown → Stopped
//! ```
//!
//! Startup validates options before touching the data directory, then takes
//! the directory lock, then starts background loops. Shutdown signals every
//! loop, joins them, and releases the directory lock last so it is held for
//! the node's whole running life.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config_store::ConfigStore;
use crate::dirlock::{DirLock, DirLockError};
use crate::message_id::{self, IdError, IdSource, MessageId};
use crate::options::{ConfigError, Options};
use crate::registry::{RegistryError, TopicRegistry};
use crate::state::NodeState;
use crate::topic::{is_valid_topic_name, Topic};

/// Lifecycle phase of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    Created,
    Validating,
    LockAcquired,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodePhase::Created => "created",
            NodePhase::Validating => "validating",
            NodePhase::LockAcquired => "lock_acquired",
            NodePhase::Running => "running",
            NodePhase::ShuttingDown => "shutting_down",
            NodePhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Node lifecycle errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(#[from] ConfigError),

    #[error("--data-path={} in use (possibly by another instance)", .0.display())]
    LockHeld(PathBuf),

    #[error("directory lock error: {0}")]
    Lock(#[source] DirLockError),

    #[error("message id generator error: {0}")]
    IdGenerator(#[from] IdError),

    #[error("background task {name} failed: {source}")]
    Task {
        name: String,
        #[source]
        source: JoinError,
    },
}

struct BackgroundTask {
    name: String,
    handle: JoinHandle<()>,
}

/// A running broker node
pub struct Node {
    phase: NodePhase,
    config: Arc<ConfigStore>,
    state: Arc<NodeState>,
    topics: Arc<TopicRegistry<Topic>>,
    ids: IdSource,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<BackgroundTask>,
    dir_lock: DirLock,
}

fn advance(phase: &mut NodePhase, next: NodePhase) {
    debug!(from = %phase, to = %next, "node phase");
    *phase = next;
}

impl Node {
    /// Validate `options`, lock the data directory and start background
    /// loops. Must be called inside a Tokio runtime.
    pub async fn start(options: Options) -> Result<Self, NodeError> {
        let mut phase = NodePhase::Created;

        advance(&mut phase, NodePhase::Validating);
        let options = match options.clone().resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                options.logf(format_args!("FATAL: {}", e));
                return Err(e.into());
            }
        };

        let data_dir = options.data_dir();
        let mut dir_lock = DirLock::new(&data_dir);
        if let Err(e) = dir_lock.lock() {
            return Err(match e {
                DirLockError::Held { .. } => {
                    options.logf(format_args!(
                        "FATAL: --data-path={} in use (possibly by another instance)",
                        data_dir.display()
                    ));
                    NodeError::LockHeld(data_dir)
                }
                other => {
                    options.logf(format_args!("FATAL: {}", other));
                    NodeError::Lock(other)
                }
            });
        }
        advance(&mut phase, NodePhase::LockAcquired);

        let worker_id = options.worker_identity()?;
        let state = Arc::new(NodeState::new());
        state.set_loading(true);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ids, id_task) = message_id::spawn(worker_id, shutdown_rx)?;
        let topics = Arc::new(TopicRegistry::new());
        let config = Arc::new(ConfigStore::new(options));

        state.set_loading(false);
        advance(&mut phase, NodePhase::Running);
        info!(
            worker_id,
            data_path = %data_dir.display(),
            "node running"
        );

        Ok(Self {
            phase,
            config,
            state,
            topics,
            ids,
            shutdown_tx,
            tasks: vec![BackgroundTask {
                name: "message-id-generator".to_string(),
                handle: id_task,
            }],
            dir_lock,
        })
    }

    /// Run a long-lived loop that shutdown will wait for.
    ///
    /// `f` receives the shutdown signal; the loop must exit once it turns
    /// true or its sender is dropped.
    pub fn spawn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(task = %name, "spawning background task");
        let handle = tokio::spawn(f(self.shutdown_tx.subscribe()));
        self.tasks.push(BackgroundTask { name, handle });
    }

    /// Signal every background loop, wait for them, then release the
    /// directory lock. Calling this on a node that is not running does
    /// nothing.
    pub async fn shutdown(&mut self) -> Result<(), NodeError> {
        if self.phase != NodePhase::Running {
            return Ok(());
        }
        self.set_phase(NodePhase::ShuttingDown);
        self.config.logf(format_args!("INFO: shutting down"));
        self.shutdown_tx.send_replace(true);

        let mut first_error = None;
        for task in self.tasks.drain(..) {
            match task.handle.await {
                Ok(()) => debug!(task = %task.name, "background task exited"),
                Err(source) => {
                    error!(task = %task.name, error = %source, "background task failed");
                    if first_error.is_none() {
                        first_error = Some(NodeError::Task {
                            name: task.name,
                            source,
                        });
                    }
                }
            }
        }

        // Lock goes last
        if let Err(e) = self.dir_lock.unlock() {
            warn!(error = %e, "failed to release data directory lock");
            if first_error.is_none() {
                first_error = Some(NodeError::Lock(e));
            }
        }

        self.set_phase(NodePhase::Stopped);
        info!("node stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn set_phase(&mut self, next: NodePhase) {
        advance(&mut self.phase, next);
    }

    pub fn phase(&self) -> NodePhase {
        self.phase
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn options(&self) -> Arc<Options> {
        self.config.current()
    }

    /// Validate and publish new options.
    ///
    /// The worker identity and data path are fixed for the node's life; a
    /// change to either is rejected and the current snapshot stays.
    pub fn replace_options(&self, mut options: Options) -> Result<(), ConfigError> {
        let current = self.config.current();
        if options.data_path.is_none() {
            options.data_path = current.data_path.clone();
        }
        let next = options.resolve()?;

        if next.worker_id != current.worker_id {
            return Err(ConfigError::Immutable("--worker-id"));
        }
        if next.data_path != current.data_path {
            return Err(ConfigError::Immutable("--data-path"));
        }

        self.config.replace(next);
        info!("configuration replaced");
        Ok(())
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    pub fn data_dir(&self) -> &Path {
        self.dir_lock.dir()
    }

    /// Receiver that turns true when shutdown begins
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Take a fresh message ID, waiting if none are buffered
    pub async fn next_message_id(&self) -> Result<MessageId, IdError> {
        self.ids.next().await
    }

    pub fn id_source(&self) -> IdSource {
        self.ids.clone()
    }

    /// Get or create the topic `name`
    pub fn get_topic(&self, name: &str) -> Result<Arc<Topic>, RegistryError> {
        if !is_valid_topic_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        Ok(self.topics.get_or_create(name, || Topic::new(name)))
    }

    /// Look up a topic without creating it
    pub fn existing_topic(&self, name: &str) -> Result<Arc<Topic>, RegistryError> {
        self.topics.get(name)
    }

    pub fn delete_topic(&self, name: &str) -> Result<(), RegistryError> {
        self.topics.remove(name)?;
        info!(topic = name, "topic deleted");
        Ok(())
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.topics.names()
    }

    pub fn topics(&self) -> &Arc<TopicRegistry<Topic>> {
        &self.topics
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Loops stop on their own; the lock goes when its descriptor closes
        if self.phase == NodePhase::Running {
            self.shutdown_tx.send_replace(true);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("phase", &self.phase)
            .field("data_dir", &self.dir_lock.dir())
            .field("topics", &self.topics.len())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
