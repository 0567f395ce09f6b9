// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line flags
//!
//! Flags override values from the config file, which override defaults.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use nq_core::{ConfigError, Options};

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "nqd", version, about = "nq broker daemon")]
pub struct Args {
    /// Path to a TOML config file
    #[arg(long, env = "NQD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Unique worker identity, [0,1024)
    #[arg(long, env = "NQD_WORKER_ID", allow_negative_numbers = true)]
    pub worker_id: Option<i64>,

    /// <addr>:<port> for TCP clients
    #[arg(long)]
    pub tcp_address: Option<String>,

    /// <addr>:<port> for HTTP clients
    #[arg(long)]
    pub http_address: Option<String>,

    /// Address advertised to peers (defaults to the hostname)
    #[arg(long)]
    pub broadcast_address: Option<String>,

    /// Data directory (defaults to the working directory)
    #[arg(long, env = "NQD_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// UDP <addr>:<port> of a statsd daemon
    #[arg(long)]
    pub statsd_address: Option<String>,

    /// Prefix for statsd keys; %s is replaced by the host key
    #[arg(long)]
    pub statsd_prefix: Option<String>,

    /// Duration between statsd pushes, e.g. 60s
    #[arg(long, value_parser = humantime::parse_duration)]
    pub statsd_interval: Option<Duration>,

    /// Include memory stats in statsd pushes
    #[arg(long)]
    pub statsd_mem_stats: Option<bool>,

    /// Maximum deflate compression level a client may negotiate, [1,9]
    #[arg(long, allow_negative_numbers = true)]
    pub max_deflate_level: Option<i32>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Build options from the config file (if any) with flags applied on top
    pub fn load_options(&self) -> Result<Options, ConfigError> {
        let base = Options::load_or_default(self.config.as_deref())?;
        Ok(self.apply(base))
    }

    pub fn apply(&self, mut opts: Options) -> Options {
        if let Some(id) = self.worker_id {
            opts.worker_id = id;
        }
        if let Some(addr) = &self.tcp_address {
            opts.tcp_address = addr.clone();
        }
        if let Some(addr) = &self.http_address {
            opts.http_address = addr.clone();
        }
        if let Some(addr) = &self.broadcast_address {
            opts.broadcast_address = addr.clone();
        }
        if let Some(path) = &self.data_path {
            opts.data_path = Some(path.clone());
        }
        if let Some(addr) = &self.statsd_address {
            opts.statsd_address = Some(addr.clone());
        }
        if let Some(prefix) = &self.statsd_prefix {
            opts.statsd_prefix = prefix.clone();
        }
        if let Some(interval) = self.statsd_interval {
            opts.statsd_interval = interval;
        }
        if let Some(mem_stats) = self.statsd_mem_stats {
            opts.statsd_mem_stats = mem_stats;
        }
        if let Some(level) = self.max_deflate_level {
            opts.max_deflate_level = level;
        }
        if let Some(level) = &self.log_level {
            opts.log_level = level.clone();
        }
        opts
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
