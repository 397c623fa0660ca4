// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object definitions stored in the state store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::StateValue;

/// Kind of a state-store object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Container for a whole device.
    Device,
    /// Container for one endpoint below a device.
    Channel,
    /// Leaf holding a value.
    State,
}

/// Type of the value a state leaf holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// `true`/`false`.
    Boolean,
    /// Any number.
    Number,
    /// Free text.
    String,
    /// No fixed type (containers).
    Mixed,
}

/// Common metadata of an object.
///
/// Field names follow the store's JSON layout (`type`, `def`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCommon {
    /// Display name.
    pub name: String,
    /// Semantic role, e.g. `switch.light` or `level.dimmer`.
    pub role: String,
    /// Value type of a state leaf.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Whether clients may read the value.
    pub read: bool,
    /// Whether clients may write the value.
    pub write: bool,
    /// Unit of measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Labels for enumerated values, keyed by the raw value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<String, String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def: Option<StateValue>,
}

/// A state-store object: container or leaf.
///
/// # Examples
///
/// ```
/// use matter_state_sync::store::{ObjectDefinition, ObjectKind};
///
/// let channel = ObjectDefinition::channel("Extended Color Light");
/// assert_eq!(channel.kind, ObjectKind::Channel);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    /// Object kind.
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Common metadata.
    pub common: ObjectCommon,
    /// Adapter-private data, e.g. the originating cluster.
    #[serde(default)]
    pub native: serde_json::Value,
}

impl ObjectDefinition {
    /// Creates a device container.
    #[must_use]
    pub fn device(name: impl Into<String>) -> Self {
        Self::container(ObjectKind::Device, name.into())
    }

    /// Creates a channel container.
    #[must_use]
    pub fn channel(name: impl Into<String>) -> Self {
        Self::container(ObjectKind::Channel, name.into())
    }

    fn container(kind: ObjectKind, name: String) -> Self {
        Self {
            kind,
            common: ObjectCommon {
                name,
                role: String::new(),
                value_type: ValueType::Mixed,
                read: true,
                write: false,
                unit: None,
                min: None,
                max: None,
                states: BTreeMap::new(),
                def: None,
            },
            native: serde_json::Value::Null,
        }
    }

    /// Returns `true` for device and channel containers.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, ObjectKind::Device | ObjectKind::Channel)
    }
}
