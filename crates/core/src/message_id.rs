// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message ID generation
//!
//! A background task keeps a bounded buffer of IDs full so producers never
//! wait on generation. Each ID is a 64-bit GUID rendered as 16 hex bytes:
//!
//! ```text
//!  63        54 53                                            0
//! +------------+-----------------------------------------------+
//! | worker id  |                  sequence                     |
//! +------------+-----------------------------------------------+
//! ```
//!
//! The sequence is one counter for the whole process. It does not wrap: once
//! all 2^54 values are spent the generator stops with `IdError::Exhausted`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Length of a rendered message ID in bytes
pub const MSG_ID_LENGTH: usize = 16;

/// Number of IDs generated ahead of demand
pub const ID_BUFFER_CAPACITY: usize = 4096;

const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 64 - WORKER_ID_BITS;

/// Largest sequence value that can be issued
pub const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// Largest worker identity that fits in the ID
pub const MAX_WORKER_BITS_VALUE: u16 = (1 << WORKER_ID_BITS) - 1;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Errors from ID generation and retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("message id sequence exhausted")]
    Exhausted,
    #[error("message id generator stopped")]
    Stopped,
    #[error("worker id {0} does not fit in 10 bits")]
    WorkerId(u16),
}

/// A unique message identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId([u8; MSG_ID_LENGTH]);

impl MessageId {
    /// Render a GUID as lowercase hex
    pub fn from_guid(guid: u64) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = [0u8; MSG_ID_LENGTH];
        for (i, byte) in guid.to_be_bytes().iter().enumerate() {
            out[i * 2] = HEX[usize::from(byte >> 4)];
            out[i * 2 + 1] = HEX[usize::from(byte & 0x0f)];
        }
        Self(out)
    }

    /// Recover the GUID this ID was rendered from
    pub fn guid(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, &c| {
            let nibble = match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                _ => 0,
            };
            (acc << 4) | u64::from(nibble)
        })
    }

    pub fn worker_id(&self) -> u16 {
        // Top WORKER_ID_BITS bits always fit in u16
        (self.guid() >> SEQUENCE_BITS) as u16
    }

    pub fn sequence(&self) -> u64 {
        self.guid() & MAX_SEQUENCE
    }

    pub fn as_bytes(&self) -> &[u8; MSG_ID_LENGTH] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.as_str())
    }
}

/// Combine a worker identity and a sequence value into a GUID
pub fn compose_guid(worker_id: u16, sequence: u64) -> Result<u64, IdError> {
    if worker_id > MAX_WORKER_BITS_VALUE {
        return Err(IdError::WorkerId(worker_id));
    }
    if sequence > MAX_SEQUENCE {
        return Err(IdError::Exhausted);
    }
    Ok((u64::from(worker_id) << SEQUENCE_BITS) | sequence)
}

/// Mints GUIDs for one worker identity from the process-wide sequence
#[derive(Debug, Clone, Copy)]
pub struct GuidFactory {
    worker_id: u16,
}

impl GuidFactory {
    pub fn new(worker_id: u16) -> Result<Self, IdError> {
        if worker_id > MAX_WORKER_BITS_VALUE {
            return Err(IdError::WorkerId(worker_id));
        }
        Ok(Self { worker_id })
    }

    pub fn next_guid(&self) -> Result<u64, IdError> {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        compose_guid(self.worker_id, sequence)
    }

    pub fn next_id(&self) -> Result<MessageId, IdError> {
        self.next_guid().map(MessageId::from_guid)
    }
}

/// Consumer side of the ID buffer. Clones share one buffer.
#[derive(Clone, Debug)]
pub struct IdSource {
    rx: Arc<Mutex<mpsc::Receiver<MessageId>>>,
}

impl IdSource {
    /// Take the next ID, waiting while the buffer is empty.
    ///
    /// Returns `Stopped` once the generator has exited and the buffer is
    /// drained.
    pub async fn next(&self) -> Result<MessageId, IdError> {
        self.rx.lock().await.recv().await.ok_or(IdError::Stopped)
    }
}

/// Start the generator loop for `worker_id`.
///
/// The loop stops when `shutdown` turns true or its sender is dropped, or
/// when every `IdSource` has been dropped.
pub fn spawn(
    worker_id: u16,
    shutdown: watch::Receiver<bool>,
) -> Result<(IdSource, JoinHandle<()>), IdError> {
    let factory = GuidFactory::new(worker_id)?;
    let (tx, rx) = mpsc::channel(ID_BUFFER_CAPACITY);
    let handle = tokio::spawn(run(factory, tx, shutdown));
    Ok((
        IdSource {
            rx: Arc::new(Mutex::new(rx)),
        },
        handle,
    ))
}

async fn run(factory: GuidFactory, tx: mpsc::Sender<MessageId>, mut shutdown: watch::Receiver<bool>) {
    debug!(worker_id = factory.worker_id, "message id generator started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let id = match factory.next_id() {
            Ok(id) => id,
            Err(e) => {
                error!(worker_id = factory.worker_id, error = %e, "message id generation stopped");
                break;
            }
        };

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            sent = tx.send(id) => {
                if sent.is_err() {
                    // Every IdSource is gone
                    break;
                }
            }
        }
    }

    debug!(worker_id = factory.worker_id, "message id generator exiting");
}

#[cfg(test)]
#[path = "message_id_tests.rs"]
mod tests;
