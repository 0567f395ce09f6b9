// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber setup and log-level reload

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nq_core::{ConfigStore, LOG_LEVELS};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log file path: {}", .0.display())]
    BadPath(PathBuf),

    #[error("failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Keeps the background writer alive and the filter swappable
pub struct Logging {
    _guard: WorkerGuard,
    filter: FilterHandle,
    from_env: bool,
}

impl Logging {
    pub fn filter_handle(&self) -> FilterHandle {
        self.filter.clone()
    }

    /// False when `RUST_LOG` chose the filter; configured levels are then
    /// ignored so per-target directives survive reloads.
    pub fn follows_config(&self) -> bool {
        !self.from_env
    }
}

/// The filter for a configured level. Levels that fail validation fall back
/// to `info` so the startup failure they cause is still logged.
fn level_filter(level: &str) -> EnvFilter {
    let level = level.to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        EnvFilter::new(level)
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Logs go to `log_file` if given,
/// otherwise to stderr.
pub fn setup(level: &str, log_file: Option<&Path>) -> Result<Logging, LoggingError> {
    let (writer, guard) = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let name = path
                .file_name()
                .ok_or_else(|| LoggingError::BadPath(path.to_path_buf()))?;
            std::fs::create_dir_all(dir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (level_filter(level), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    Ok(Logging {
        _guard: guard,
        filter: handle,
        from_env,
    })
}

/// Follow configuration reloads, swapping the filter when `log_level`
/// changes. Exits when shutdown is signalled.
pub async fn follow_config(
    config: Arc<ConfigStore>,
    filter: FilterHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut level = config.current().log_level.clone();
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = config.await_reload() => {
                let next = config.current().log_level.clone();
                if next == level {
                    debug!("reload left log level unchanged");
                    continue;
                }
                match filter.reload(level_filter(&next)) {
                    Ok(()) => {
                        info!(from = %level, to = %next, "log level changed");
                        level = next;
                    }
                    Err(e) => warn!(error = %e, "failed to swap log filter"),
                }
            }
        }
    }
    debug!("log level follower stopped");
}
