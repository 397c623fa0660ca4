// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata of the state leaves adapters create.

use std::collections::BTreeMap;

use serde_json::json;

use crate::protocol::{AttributeId, ClusterId};
use crate::store::{ObjectCommon, ObjectDefinition, ObjectKind, ValueType};

/// Description of one state leaf: type, role, access and value labels.
///
/// # Examples
///
/// ```
/// use matter_state_sync::adapter::LeafSpec;
///
/// let spec = LeafSpec::number("Level", "level.dimmer")
///     .writable()
///     .with_range(1.0, 254.0);
/// assert!(spec.is_writable());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSpec {
    name: String,
    role: String,
    value_type: ValueType,
    read: bool,
    write: bool,
    unit: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    states: BTreeMap<String, String>,
}

impl LeafSpec {
    fn new(name: &str, role: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            role: role.to_string(),
            value_type,
            read: true,
            write: false,
            unit: None,
            min: None,
            max: None,
            states: BTreeMap::new(),
        }
    }

    /// Creates a read-only boolean leaf.
    #[must_use]
    pub fn boolean(name: &str, role: &str) -> Self {
        Self::new(name, role, ValueType::Boolean)
    }

    /// Creates a read-only number leaf.
    #[must_use]
    pub fn number(name: &str, role: &str) -> Self {
        Self::new(name, role, ValueType::Number)
    }

    /// Makes the leaf readable and writable.
    #[must_use]
    pub fn writable(mut self) -> Self {
        self.write = true;
        self
    }

    /// Makes the leaf write-only (a trigger).
    #[must_use]
    pub fn write_only(mut self) -> Self {
        self.read = false;
        self.write = true;
        self
    }

    /// Sets the unit of measurement.
    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Sets numeric bounds.
    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Sets labels for enumerated values.
    #[must_use]
    pub fn with_states(mut self, labels: &[(u8, &str)]) -> Self {
        self.states = labels
            .iter()
            .map(|(value, label)| (value.to_string(), (*label).to_string()))
            .collect();
        self
    }

    /// Returns `true` if users may write the leaf.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.write
    }

    /// Returns the role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Builds the store object, tagging it with its cluster origin.
    #[must_use]
    pub fn to_object(&self, tag: ClusterTag) -> ObjectDefinition {
        ObjectDefinition {
            kind: ObjectKind::State,
            common: ObjectCommon {
                name: self.name.clone(),
                role: self.role.clone(),
                value_type: self.value_type,
                read: self.read,
                write: self.write,
                unit: self.unit.clone(),
                min: self.min,
                max: self.max,
                states: self.states.clone(),
                def: None,
            },
            native: tag.to_native(),
        }
    }
}

/// Cluster origin of a leaf, stored in the object's `native` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterTag {
    /// Cluster the leaf mirrors.
    pub cluster: ClusterId,
    /// Attribute the leaf mirrors; `None` for command triggers.
    pub attribute: Option<AttributeId>,
}

impl ClusterTag {
    /// Tag for a leaf mirroring an attribute.
    #[must_use]
    pub fn attribute(cluster: ClusterId, attribute: AttributeId) -> Self {
        Self {
            cluster,
            attribute: Some(attribute),
        }
    }

    /// Tag for a trigger leaf that only issues commands.
    #[must_use]
    pub fn command(cluster: ClusterId) -> Self {
        Self {
            cluster,
            attribute: None,
        }
    }

    fn to_native(self) -> serde_json::Value {
        match self.attribute {
            Some(attribute) => json!({ "clusterId": self.cluster, "attributeId": attribute }),
            None => json!({ "clusterId": self.cluster }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_only_is_not_readable() {
        let object = LeafSpec::boolean("Start", "button")
            .write_only()
            .to_object(ClusterTag::command(3));

        assert!(!object.common.read);
        assert!(object.common.write);
        assert_eq!(object.native["clusterId"], 3);
        assert!(object.native.get("attributeId").is_none());
    }

    #[test]
    fn states_are_keyed_by_raw_value() {
        let object = LeafSpec::number("Type", "state")
            .with_states(&[(0, "None"), (1, "LightOutput")])
            .to_object(ClusterTag::attribute(3, 1));

        assert_eq!(object.common.states["1"], "LightOutput");
        assert_eq!(object.native["attributeId"], 1);
    }
}
