// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge event types.

use crate::types::{DeviceId, EndpointPath};

/// Events emitted by the bridge manager.
///
/// These events report adapter lifecycle and non-fatal failures. None of
/// them requires action; they exist so a host can surface sync problems
/// without parsing logs.
///
/// # Examples
///
/// ```
/// use matter_state_sync::event::BridgeEvent;
/// use matter_state_sync::types::{DeviceId, EndpointPath};
///
/// let attached = BridgeEvent::AdapterAttached {
///     path: EndpointPath::new("4660", [1]),
///     adapter: "OnOff",
///     keys: vec!["matter.0.4660.1.onOff.state".to_string()],
/// };
/// assert_eq!(attached.device_id(), &DeviceId::new("4660"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// An adapter was constructed for an endpoint.
    AdapterAttached {
        /// The endpoint the adapter serves.
        path: EndpointPath,
        /// Adapter name.
        adapter: &'static str,
        /// State-store keys the adapter owns.
        keys: Vec<String>,
    },

    /// An adapter failed to construct; sibling adapters are unaffected.
    AdapterFailed {
        /// The endpoint the adapter was probed on.
        path: EndpointPath,
        /// Adapter name.
        adapter: &'static str,
        /// Error description.
        error: String,
    },

    /// The endpoint's container could not be created; no probe ran.
    EndpointFailed {
        /// The endpoint.
        path: EndpointPath,
        /// Error description.
        error: String,
    },

    /// Carrying out a store write on the device failed.
    ///
    /// The store keeps the value the user wrote.
    WriteFailed {
        /// The device.
        device_id: DeviceId,
        /// The key whose write could not be carried out.
        key: String,
        /// Error description.
        error: String,
    },

    /// A device was removed and all its adapters torn down.
    DeviceRemoved {
        /// The device.
        device_id: DeviceId,
        /// Number of adapters torn down.
        adapters: usize,
    },
}

impl BridgeEvent {
    /// Returns the device this event concerns.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::AdapterAttached { path, .. }
            | Self::AdapterFailed { path, .. }
            | Self::EndpointFailed { path, .. } => path.device(),
            Self::WriteFailed { device_id, .. } | Self::DeviceRemoved { device_id, .. } => device_id,
        }
    }

    /// Returns `true` if this event reports a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::AdapterFailed { .. } | Self::EndpointFailed { .. } | Self::WriteFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_from_path_and_field() {
        let failed = BridgeEvent::AdapterFailed {
            path: EndpointPath::new("n1", [2]),
            adapter: "Identify",
            error: "boom".to_string(),
        };
        assert_eq!(failed.device_id().as_str(), "n1");
        assert!(failed.is_failure());

        let removed = BridgeEvent::DeviceRemoved {
            device_id: DeviceId::new("n2"),
            adapters: 3,
        };
        assert_eq!(removed.device_id().as_str(), "n2");
        assert!(!removed.is_failure());

        let write = BridgeEvent::WriteFailed {
            device_id: DeviceId::new("n3"),
            key: "matter.0.n3.onOff.state".to_string(),
            error: "unreachable".to_string(),
        };
        assert_eq!(write.device_id().as_str(), "n3");
        assert!(write.is_failure());
    }
}
