// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device and endpoint identifiers.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Identifier of a commissioned device, as assigned by the protocol layer.
///
/// For Matter this is the node id rendered as a string. The raw id is
/// kept as given; [`key_segment`](Self::key_segment) renders it for use in
/// state-store keys, where `.` is the separator.
///
/// # Examples
///
/// ```
/// use matter_state_sync::types::DeviceId;
///
/// let id = DeviceId::new("4660");
/// assert_eq!(id.as_str(), "4660");
///
/// let dotted = DeviceId::new("hub.7");
/// assert_eq!(dotted.as_str(), "hub.7");
/// assert_eq!(dotted.key_segment(), "hub%2E7");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier.
    ///
    /// Use [`DeviceId::try_from`] to reject empty ids.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier as a single state-store key segment.
    ///
    /// `%` and `.` are percent-encoded, so distinct ids always give
    /// distinct segments.
    #[must_use]
    pub fn key_segment(&self) -> Cow<'_, str> {
        if !self.0.contains(['%', '.']) {
            return Cow::Borrowed(&self.0);
        }
        let mut segment = String::with_capacity(self.0.len() + 4);
        for c in self.0.chars() {
            match c {
                '%' => segment.push_str("%25"),
                '.' => segment.push_str("%2E"),
                other => segment.push(other),
            }
        }
        Cow::Owned(segment)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValueError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        if id.is_empty() {
            return Err(ValueError::EmptyDeviceId);
        }
        Ok(Self(id))
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(node_id: u64) -> Self {
        Self(node_id.to_string())
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Position of an endpoint in a device's object tree.
///
/// The root endpoint of a device has no segments; each nested endpoint
/// adds the index of its child endpoint.
///
/// # Examples
///
/// ```
/// use matter_state_sync::types::EndpointPath;
///
/// let root = EndpointPath::root("4660");
/// assert_eq!(root.namespace(), "");
///
/// let light = EndpointPath::new("4660", [1, 2]);
/// assert_eq!(light.namespace(), "1.2.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointPath {
    device: DeviceId,
    segments: Vec<u16>,
}

impl EndpointPath {
    /// Creates a path for a nested endpoint.
    #[must_use]
    pub fn new(device: impl Into<DeviceId>, segments: impl IntoIterator<Item = u16>) -> Self {
        Self {
            device: device.into(),
            segments: segments.into_iter().collect(),
        }
    }

    /// Creates the path of a device's root endpoint.
    #[must_use]
    pub fn root(device: impl Into<DeviceId>) -> Self {
        Self {
            device: device.into(),
            segments: Vec::new(),
        }
    }

    /// Returns the device this endpoint belongs to.
    #[must_use]
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Returns the child indices below the device.
    #[must_use]
    pub fn segments(&self) -> &[u16] {
        &self.segments
    }

    /// Returns `true` for a device's root endpoint.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the state-store namespace prefix for this endpoint.
    ///
    /// Empty for the root endpoint, otherwise the segments joined with `.`
    /// plus a trailing `.`. The device id is not part of the prefix.
    #[must_use]
    pub fn namespace(&self) -> String {
        let mut prefix = String::new();
        for segment in &self.segments {
            prefix.push_str(&segment.to_string());
            prefix.push('.');
        }
        prefix
    }
}

impl fmt::Display for EndpointPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
