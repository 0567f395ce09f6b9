// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic handles held by the registry

use std::time::SystemTime;

/// Longest accepted topic name, suffix included
pub const MAX_TOPIC_NAME_LENGTH: usize = 64;

/// Suffix marking a topic that is not persisted
pub const EPHEMERAL_SUFFIX: &str = "#ephemeral";

/// Check a topic name: 1 to 64 characters of `[.a-zA-Z0-9_-]`, optionally
/// followed by `#ephemeral`.
pub fn is_valid_topic_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_TOPIC_NAME_LENGTH {
        return false;
    }
    let base = name.strip_suffix(EPHEMERAL_SUFFIX).unwrap_or(name);
    !base.is_empty()
        && base
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// A topic known to the node.
///
/// Publish and subscribe state lives with the topic's owners; the registry
/// only tracks which topics exist.
#[derive(Debug)]
pub struct Topic {
    name: String,
    ephemeral: bool,
    created_at: SystemTime,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let ephemeral = name.ends_with(EPHEMERAL_SUFFIX);
        Self {
            name,
            ephemeral,
            created_at: SystemTime::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
}
