// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Injected logging capability
//!
//! Subsystems write operator-facing diagnostics through a `Logger` carried by
//! the configuration snapshot. When no logger is configured, writes are
//! silently dropped.

use std::sync::Arc;

/// Writes a formatted diagnostic line
pub trait Logger: Send + Sync {
    /// `call_depth` counts the frames between the caller that produced the
    /// message and this call.
    fn output(&self, call_depth: usize, message: &str);
}

/// Forwards diagnostics to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn output(&self, call_depth: usize, message: &str) {
        if message.starts_with("FATAL") || message.starts_with("ERROR") {
            tracing::error!(target: "nq", call_depth, "{}", message);
        } else if message.starts_with("WARN") {
            tracing::warn!(target: "nq", call_depth, "{}", message);
        } else {
            tracing::info!(target: "nq", call_depth, "{}", message);
        }
    }
}

impl<F> Logger for F
where
    F: Fn(usize, &str) + Send + Sync,
{
    fn output(&self, call_depth: usize, message: &str) {
        self(call_depth, message)
    }
}

/// Shared logger handle as stored in `Options`
pub type SharedLogger = Arc<dyn Logger>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_logger_receives_depth_and_message() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let logger: SharedLogger = Arc::new(move |depth: usize, msg: &str| {
            sink.lock().unwrap().push((depth, msg.to_string()));
        });

        logger.output(2, "FATAL: something");

        let lines = lines.lock().unwrap();
        assert_eq!(lines.as_slice(), &[(2, "FATAL: something".to_string())]);
    }

    #[test]
    fn tracing_logger_accepts_every_prefix() {
        let logger = TracingLogger;
        logger.output(2, "FATAL: a");
        logger.output(2, "WARN: b");
        logger.output(2, "c");
    }
}
