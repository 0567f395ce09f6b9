// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nq broker daemon (nqd)
//!
//! Loads options, takes the data directory lock and runs the node until
//! SIGTERM or SIGINT. SIGHUP re-reads the config file and publishes it.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod args;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use nq_core::{Node, Options, SharedLogger, TracingLogger};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("nqd: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let options = with_logger(args.load_options()?);

    let logging = logging::setup(&options.log_level, args.log_file.as_deref())?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting nqd");

    let mut node = match Node::start(options).await {
        Ok(node) => node,
        Err(e) => {
            // Node::start has already written the FATAL line
            drop(logging);
            return Err(e.into());
        }
    };

    if logging.follows_config() {
        let config = Arc::clone(node.config());
        let filter = logging.filter_handle();
        node.spawn("log-level", move |shutdown| {
            logging::follow_config(config, filter, shutdown)
        });
    } else {
        info!("RUST_LOG is set, log level will not follow configuration");
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let opts = node.options();
    info!(
        tcp = %opts.tcp_address,
        http = %opts.http_address,
        data_path = %node.data_dir().display(),
        "nqd ready"
    );

    // Signal ready for a supervising parent
    println!("READY");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, reloading configuration");
                reload(&node, &args);
            }
        }
    }

    node.shutdown().await?;
    info!("nqd stopped");
    Ok(())
}

/// Marks faults stored by a rejected reload
const RELOAD_FAULT_PREFIX: &str = "config reload: ";

/// Re-read the config file with flags applied and publish it. Failures keep
/// the running configuration and are recorded as the node's last fault.
fn reload(node: &Node, args: &Args) {
    let result = args
        .load_options()
        .and_then(|opts| node.replace_options(with_logger(opts)));
    match result {
        Ok(()) => {
            node.state()
                .clear_fault_if(|f| f.message.starts_with(RELOAD_FAULT_PREFIX));
        }
        Err(e) => {
            error!(error = %e, "configuration reload rejected");
            node.state()
                .store_fault(format_args!("{}{}", RELOAD_FAULT_PREFIX, e));
        }
    }
    if !node.state().is_healthy() {
        warn!(health = %node.state().health(), "node unhealthy");
    }
}

fn with_logger(mut options: Options) -> Options {
    let logger: SharedLogger = Arc::new(TracingLogger);
    options.logger = Some(logger);
    options
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
