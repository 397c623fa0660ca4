// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process state store.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{ObjectDefinition, StateRecord, StateStore, StateWrite};
use crate::error::StoreError;
use crate::types::StateValue;

/// Default capacity of the write notification channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, ObjectDefinition>,
    states: BTreeMap<String, StateRecord>,
}

/// A [`StateStore`] held entirely in memory.
///
/// Every `set_state` updates the record and broadcasts the [`StateWrite`]
/// under one lock, so subscribers see writes in the order they were applied.
/// The store also counts object and state writes, which makes it suitable
/// for checking idempotence.
///
/// # Examples
///
/// ```
/// use matter_state_sync::store::{MemoryStore, StateStore};
///
/// # async fn example() -> Result<(), matter_state_sync::error::StoreError> {
/// let store = MemoryStore::new();
/// let mut writes = store.subscribe();
///
/// store.set_state("matter.0.4660.onOff.state", true.into(), false).await?;
///
/// let write = writes.recv().await.unwrap();
/// assert!(!write.ack);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    sender: broadcast::Sender<StateWrite>,
    object_writes: AtomicUsize,
    state_writes: AtomicUsize,
    rejected_prefixes: Mutex<HashSet<String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates an empty store with the given notification capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Mutex::new(Inner::default()),
            sender,
            object_writes: AtomicUsize::new(0),
            state_writes: AtomicUsize::new(0),
            rejected_prefixes: Mutex::new(HashSet::new()),
        }
    }

    /// Makes `set_object` fail for every key starting with `prefix`.
    pub fn reject_objects_under(&self, prefix: impl Into<String>) {
        self.rejected_prefixes.lock().insert(prefix.into());
    }

    /// Returns the number of successful `set_object` calls.
    #[must_use]
    pub fn object_writes(&self) -> usize {
        self.object_writes.load(Ordering::SeqCst)
    }

    /// Returns the number of successful `set_state` calls.
    #[must_use]
    pub fn state_writes(&self) -> usize {
        self.state_writes.load(Ordering::SeqCst)
    }

    /// Returns a copy of an object definition.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<ObjectDefinition> {
        self.inner.lock().objects.get(key).cloned()
    }

    /// Returns a copy of a state record.
    #[must_use]
    pub fn state(&self, key: &str) -> Option<StateRecord> {
        self.inner.lock().states.get(key).cloned()
    }

    /// Returns all object keys starting with `prefix`, sorted.
    #[must_use]
    pub fn object_keys(&self, prefix: &str) -> Vec<String> {
        self.inner
            .lock()
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn write_state(&self, key: &str, value: StateValue, ack: bool) {
        let mut inner = self.inner.lock();
        inner.states.insert(
            key.to_string(),
            StateRecord {
                value: value.clone(),
                ack,
                ts: Utc::now(),
            },
        );
        self.state_writes.fetch_add(1, Ordering::SeqCst);

        // Ignore errors (no subscribers)
        let _ = self.sender.send(StateWrite {
            key: key.to_string(),
            value,
            ack,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_object(&self, key: &str) -> Result<Option<ObjectDefinition>, StoreError> {
        Ok(self.object(key))
    }

    async fn set_object(&self, key: &str, object: ObjectDefinition) -> Result<(), StoreError> {
        let rejected = self
            .rejected_prefixes
            .lock()
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if rejected {
            return Err(StoreError::ObjectRejected {
                key: key.to_string(),
                reason: "key is read-only".to_string(),
            });
        }

        self.inner.lock().objects.insert(key.to_string(), object);
        self.object_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_state(&self, key: &str) -> Result<Option<StateRecord>, StoreError> {
        Ok(self.state(key))
    }

    async fn set_state(&self, key: &str, value: StateValue, ack: bool) -> Result<(), StoreError> {
        self.write_state(key, value, ack);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StateWrite> {
        self.sender.subscribe()
    }
}
