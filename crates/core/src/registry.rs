// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic registry: name → shared handle
//!
//! Every mutation runs under one internal write lock, so creates and removes
//! for the same name are applied one at a time and the registry reflects
//! whichever ran last. A create after a remove makes a fresh handle; a remove
//! after a create drops it. The lock is never exposed to callers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::debug;

/// Registry lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("topic not found: {0}")]
    NotFound(String),
    #[error("invalid topic name: {0:?}")]
    InvalidName(String),
}

/// Concurrency-safe map from topic name to handle
#[derive(Debug)]
pub struct TopicRegistry<T> {
    topics: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Default for TopicRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TopicRegistry<T> {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Look up an existing handle without creating one
    pub fn get(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        topics
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Return the handle for `name`, creating it with `factory` if absent.
    ///
    /// `factory` runs at most once per absent name, even when many callers
    /// race; all of them receive the same handle.
    pub fn get_or_create<F>(&self, name: &str, factory: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Ok(existing) = self.get(name) {
            return existing;
        }

        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        // Re-check: another caller may have created it between the locks
        let handle = topics.entry(name.to_string()).or_insert_with(|| {
            debug!(topic = name, "creating topic");
            Arc::new(factory())
        });
        Arc::clone(handle)
    }

    /// Like `get_or_create` with a fallible factory. On error nothing is
    /// inserted.
    pub fn try_get_or_create<F, E>(&self, name: &str, factory: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Ok(existing) = self.get(name) {
            return Ok(existing);
        }

        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = topics.get(name) {
            return Ok(Arc::clone(existing));
        }
        let handle = Arc::new(factory()?);
        debug!(topic = name, "creating topic");
        topics.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Remove `name`, returning its handle
    pub fn remove(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let removed = topics
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        debug!(topic = name, "removed topic");
        Ok(removed)
    }

    pub fn contains(&self, name: &str) -> bool {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        topics.contains_key(name)
    }

    /// Sorted topic names at this instant
    pub fn names(&self) -> Vec<String> {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// All entries at this instant, sorted by name
    pub fn snapshot(&self) -> Vec<(String, Arc<T>)> {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<_> = topics
            .iter()
            .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.topics.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
