// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State-store interface.
//!
//! The state store is a hierarchical key/value store owned by the host
//! home-automation system. Keys are dot-separated paths, every value
//! carries an `ack` flag:
//!
//! - `ack = true`: the value is confirmed truth, written by the bridge from
//!   device data
//! - `ack = false`: the value is a pending request, written by a user or a
//!   script, that the bridge should carry out
//!
//! The bridge only talks to the store through [`StateStore`].
//! [`MemoryStore`] is a complete in-process implementation.

mod memory;
mod object;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use object::{ObjectCommon, ObjectDefinition, ObjectKind, ValueType};

use crate::error::StoreError;
use crate::types::StateValue;

/// Current value of a state leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// The value.
    #[serde(rename = "val")]
    pub value: StateValue,
    /// Whether the value is confirmed (`true`) or pending (`false`).
    pub ack: bool,
    /// Time of the last write.
    pub ts: DateTime<Utc>,
}

/// A write notification emitted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateWrite {
    /// Fully-qualified key that was written.
    pub key: String,
    /// The written value.
    pub value: StateValue,
    /// The acknowledged flag of the write.
    pub ack: bool,
}

impl StateWrite {
    /// Creates a pending (unacknowledged) write.
    #[must_use]
    pub fn pending(key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ack: false,
        }
    }

    /// Creates an acknowledged write.
    #[must_use]
    pub fn acknowledged(key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ack: true,
        }
    }
}

/// Operations the bridge needs from the state store.
///
/// Implementations must apply a write's value and `ack` flag atomically and
/// emit the matching [`StateWrite`] in the same order writes were applied.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Reads an object definition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be queried.
    async fn get_object(&self, key: &str) -> Result<Option<ObjectDefinition>, StoreError>;

    /// Creates or replaces an object definition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the object is rejected.
    async fn set_object(&self, key: &str, object: ObjectDefinition) -> Result<(), StoreError>;

    /// Reads the current value of a state leaf.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be queried.
    async fn get_state(&self, key: &str) -> Result<Option<StateRecord>, StoreError>;

    /// Writes a state value with the given acknowledged flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn set_state(&self, key: &str, value: StateValue, ack: bool) -> Result<(), StoreError>;

    /// Subscribes to every state write.
    fn subscribe(&self) -> broadcast::Receiver<StateWrite>;
}
