// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-protocol interface.
//!
//! A commissioned device is a tree of endpoints; each [`Endpoint`] exposes
//! zero or more [`ClusterClient`]s. The bridge borrows the clients for the
//! lifetime of its adapters and never owns the device connection itself.
//!
//! [`VirtualCluster`] is an in-process cluster that behaves like a device:
//! it answers reads, applies commands to its attributes and notifies
//! listeners.

pub mod clusters;
mod command;
mod virtual_cluster;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub use clusters::{AttributeId, ClusterId};
pub use command::{ClusterCommand, LevelOptions};
pub use virtual_cluster::VirtualCluster;

use crate::error::ProtocolError;
use crate::types::{AttributeValue, EndpointPath};

/// Callback invoked with `(attribute, new value)` on attribute changes.
pub type AttributeListener = Arc<dyn Fn(AttributeId, AttributeValue) + Send + Sync>;

/// Handle of a registered attribute listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Creates a listener id with the given value.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({})", self.0)
    }
}

/// Typed access to one cluster on one endpoint.
#[async_trait]
pub trait ClusterClient: Send + Sync + fmt::Debug {
    /// Returns the cluster this client talks to.
    fn cluster_id(&self) -> ClusterId;

    /// Reads the current value of an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the device is unreachable or the
    /// attribute does not exist.
    async fn read_attribute(&self, attribute: AttributeId) -> Result<AttributeValue, ProtocolError>;

    /// Registers a listener for changes of `attribute`.
    fn add_attribute_listener(&self, attribute: AttributeId, listener: AttributeListener)
    -> ListenerId;

    /// Removes a previously registered listener.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the device is gone or the listener is
    /// unknown. Callers tearing down treat this as best effort.
    fn remove_attribute_listener(&self, id: ListenerId) -> Result<(), ProtocolError>;

    /// Invokes a command on the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the device rejects the command or
    /// cannot be reached.
    async fn invoke(&self, command: ClusterCommand) -> Result<(), ProtocolError>;
}

/// A discovered endpoint and the cluster clients it exposes.
#[derive(Debug, Clone)]
pub struct Endpoint {
    path: EndpointPath,
    device_type: String,
    clients: Vec<Arc<dyn ClusterClient>>,
}

impl Endpoint {
    /// Creates an endpoint with no clusters.
    ///
    /// `device_type` names the endpoint's device type, e.g.
    /// `"Dimmable Light"`, and becomes the container's display name.
    #[must_use]
    pub fn new(path: EndpointPath, device_type: impl Into<String>) -> Self {
        Self {
            path,
            device_type: device_type.into(),
            clients: Vec::new(),
        }
    }

    /// Adds a cluster client.
    #[must_use]
    pub fn with_cluster(mut self, client: Arc<dyn ClusterClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Returns the endpoint's path.
    #[must_use]
    pub fn path(&self) -> &EndpointPath {
        &self.path
    }

    /// Returns the device-type name.
    #[must_use]
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    /// Returns the client for `cluster`, if the endpoint exposes it.
    #[must_use]
    pub fn cluster(&self, cluster: ClusterId) -> Option<Arc<dyn ClusterClient>> {
        self.clients
            .iter()
            .find(|client| client.cluster_id() == cluster)
            .cloned()
    }

    /// Returns the ids of all exposed clusters.
    #[must_use]
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.clients.iter().map(|c| c.cluster_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_lookup_is_optional() {
        let endpoint = Endpoint::new(EndpointPath::new("n1", [1]), "On/Off Light")
            .with_cluster(Arc::new(VirtualCluster::new(clusters::on_off::ID)));

        assert!(endpoint.cluster(clusters::on_off::ID).is_some());
        assert!(endpoint.cluster(clusters::level_control::ID).is_none());
        assert_eq!(endpoint.cluster_ids(), vec![clusters::on_off::ID]);
    }

    #[test]
    fn listener_id_display() {
        assert_eq!(ListenerId::new(7).to_string(), "Listener(7)");
    }
}
