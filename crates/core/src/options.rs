// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker options: the configuration snapshot type
//!
//! `Options` is a plain value. It is validated and normalized by
//! [`Options::resolve`] before a node starts, then published through the
//! [`ConfigStore`](crate::ConfigStore) and never mutated again.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::logger::{SharedLogger, TracingLogger};

/// Worker identities live in `0..MAX_WORKER_ID`
pub const MAX_WORKER_ID: i64 = 1024;

/// Accepted log levels, lowest first
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors. Any of these is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--worker-id must be [0,1024), got {0}")]
    WorkerId(i64),

    #[error("--max-deflate-level must be [1,9], got {0}")]
    DeflateLevel(i32),

    #[error("failed to parse {field} ({addr}) - {reason}")]
    Address {
        field: &'static str,
        addr: String,
        reason: String,
    },

    #[error("--log-level must be one of trace, debug, info, warn, error; got {0:?}")]
    LogLevel(String),

    #[error("cannot determine data path: {0}")]
    DataPath(#[source] io::Error),

    #[error("{0} cannot be changed while the node is running")]
    Immutable(&'static str),

    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// All broker tunables
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Worker identity mixed into every message ID
    #[serde(alias = "id")]
    pub worker_id: i64,
    pub tcp_address: String,
    pub http_address: String,
    /// Address advertised to peers; also keys the statsd prefix
    pub broadcast_address: String,

    /// Defaults to the current working directory
    pub data_path: Option<PathBuf>,

    pub statsd_address: Option<String>,
    /// May contain `%s`, replaced by the host key
    pub statsd_prefix: String,
    #[serde(with = "humantime_serde")]
    pub statsd_interval: Duration,
    pub statsd_mem_stats: bool,

    pub max_deflate_level: i32,

    pub log_level: String,

    #[serde(skip)]
    pub logger: Option<SharedLogger>,
}

impl Default for Options {
    fn default() -> Self {
        let hostname = hostname();
        Self {
            worker_id: default_worker_id(&hostname),
            tcp_address: "0.0.0.0:4150".to_string(),
            http_address: "0.0.0.0:4151".to_string(),
            broadcast_address: hostname,
            data_path: None,
            statsd_address: None,
            statsd_prefix: "nq.%s".to_string(),
            statsd_interval: Duration::from_secs(60),
            statsd_mem_stats: true,
            max_deflate_level: 6,
            log_level: "info".to_string(),
            logger: Some(Arc::new(TracingLogger)),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("worker_id", &self.worker_id)
            .field("tcp_address", &self.tcp_address)
            .field("http_address", &self.http_address)
            .field("broadcast_address", &self.broadcast_address)
            .field("data_path", &self.data_path)
            .field("statsd_address", &self.statsd_address)
            .field("statsd_prefix", &self.statsd_prefix)
            .field("statsd_interval", &self.statsd_interval)
            .field("statsd_mem_stats", &self.statsd_mem_stats)
            .field("max_deflate_level", &self.max_deflate_level)
            .field("log_level", &self.log_level)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl Options {
    /// Load options from a TOML file, or defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Load options from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every bounded option without changing anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..MAX_WORKER_ID).contains(&self.worker_id) {
            return Err(ConfigError::WorkerId(self.worker_id));
        }
        if !(1..=9).contains(&self.max_deflate_level) {
            return Err(ConfigError::DeflateLevel(self.max_deflate_level));
        }
        split_host_port(&self.tcp_address).map_err(|reason| ConfigError::Address {
            field: "--tcp-address",
            addr: self.tcp_address.clone(),
            reason,
        })?;
        split_host_port(&self.http_address).map_err(|reason| ConfigError::Address {
            field: "--http-address",
            addr: self.http_address.clone(),
            reason,
        })?;
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::LogLevel(self.log_level.clone()));
        }
        Ok(())
    }

    /// Validate, then fill in derived values: the data path defaults to the
    /// working directory and the statsd prefix gets its host key.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        self.validate()?;

        if self.data_path.is_none() {
            self.data_path = Some(std::env::current_dir().map_err(ConfigError::DataPath)?);
        }

        if !self.statsd_prefix.is_empty() && self.statsd_prefix.contains("%s") {
            let (_, port) = split_host_port(&self.http_address).map_err(|reason| {
                ConfigError::Address {
                    field: "--http-address",
                    addr: self.http_address.clone(),
                    reason,
                }
            })?;
            let key = host_key(&join_host_port(&self.broadcast_address, port));
            self.statsd_prefix = self.statsd_prefix.replace("%s", &key);
        }
        if !self.statsd_prefix.is_empty() && !self.statsd_prefix.ends_with('.') {
            self.statsd_prefix.push('.');
        }

        Ok(self)
    }

    /// Resolved data directory. Only meaningful after `resolve`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_default()
    }

    /// Worker identity narrowed to its valid range
    pub fn worker_identity(&self) -> Result<u16, ConfigError> {
        if !(0..MAX_WORKER_ID).contains(&self.worker_id) {
            return Err(ConfigError::WorkerId(self.worker_id));
        }
        u16::try_from(self.worker_id).map_err(|_| ConfigError::WorkerId(self.worker_id))
    }

    /// Write a diagnostic through the configured logger, if any
    pub fn logf(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            logger.output(2, &args.to_string());
        }
    }
}

/// Split `host:port`, accepting bracketed IPv6 hosts and an empty host
pub fn split_host_port(addr: &str) -> Result<(&str, u16), String> {
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| "missing ']' in address".to_string())?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| "missing port in address".to_string())?;
        (host, port)
    } else {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| "missing port in address".to_string())?;
        if host.contains(':') {
            return Err("too many colons in address".to_string());
        }
        (host, port)
    };

    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port {port:?}: {e}"))?;
    Ok((host, port))
}

/// Join a host and port, bracketing IPv6 hosts
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Statsd-safe form of `host:port`
pub fn host_key(host_port: &str) -> String {
    host_port.replace(['.', ':'], "_")
}

/// Derive a stable worker identity from the hostname
pub fn default_worker_id(hostname: &str) -> i64 {
    let digest = Sha256::digest(hostname.as_bytes());
    i64::from(crc32fast::hash(&digest)) % MAX_WORKER_ID
}

/// The OS hostname, or `localhost` when it cannot be read
pub fn hostname() -> String {
    match hostname::get() {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        Ok(_) => "localhost".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot read hostname, using localhost");
            "localhost".to_string()
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
