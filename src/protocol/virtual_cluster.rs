// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process cluster that behaves like a device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::clusters::{identify, level_control, on_off};
use super::{
    AttributeId, AttributeListener, ClusterClient, ClusterCommand, ClusterId, ListenerId,
};
use crate::error::ProtocolError;
use crate::types::AttributeValue;

/// A cluster client backed by in-memory attributes.
///
/// Commands are recorded and applied to the matching attributes, and every
/// attribute change is reported to listeners, the way a real device reports
/// state after a command. Faults can be injected with
/// [`set_unreachable`](Self::set_unreachable) and
/// [`fail_commands`](Self::fail_commands).
///
/// # Examples
///
/// ```
/// use matter_state_sync::protocol::{ClusterClient, VirtualCluster, clusters::on_off};
///
/// # async fn example() {
/// let cluster = VirtualCluster::new(on_off::ID).with_attribute(on_off::ON_OFF, false);
///
/// cluster.set_attribute(on_off::ON_OFF, true);
/// assert_eq!(
///     cluster.read_attribute(on_off::ON_OFF).await.unwrap().as_bool(),
///     Some(true)
/// );
/// # }
/// ```
#[derive(Debug)]
pub struct VirtualCluster {
    cluster_id: ClusterId,
    attributes: RwLock<HashMap<AttributeId, AttributeValue>>,
    listeners: RwLock<HashMap<ListenerId, (AttributeId, ListenerEntry)>>,
    next_listener: AtomicU64,
    invoked: Mutex<Vec<ClusterCommand>>,
    unreachable: AtomicBool,
    fail_commands: AtomicBool,
}

struct ListenerEntry(AttributeListener);

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AttributeListener")
    }
}

impl VirtualCluster {
    /// Creates a cluster with no attributes.
    #[must_use]
    pub fn new(cluster_id: ClusterId) -> Self {
        Self {
            cluster_id,
            attributes: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            invoked: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            fail_commands: AtomicBool::new(false),
        }
    }

    /// Sets an attribute value without notifying listeners.
    #[must_use]
    pub fn with_attribute(self, attribute: AttributeId, value: impl Into<AttributeValue>) -> Self {
        self.attributes.write().insert(attribute, value.into());
        self
    }

    /// Sets an attribute value and notifies its listeners.
    ///
    /// Listeners are only notified if the value actually changed.
    pub fn set_attribute(&self, attribute: AttributeId, value: impl Into<AttributeValue>) {
        let value = value.into();
        let previous = self.attributes.write().insert(attribute, value.clone());
        if previous.as_ref() == Some(&value) {
            return;
        }

        // Collect first so listeners may (un)register without deadlocking
        let listeners: Vec<AttributeListener> = self
            .listeners
            .read()
            .values()
            .filter(|(attr, _)| *attr == attribute)
            .map(|(_, entry)| entry.0.clone())
            .collect();

        for listener in listeners {
            listener(attribute, value.clone());
        }
    }

    /// Makes every call fail as if the device had disappeared.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Makes command invocations fail while reads keep working.
    pub fn fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// Returns the commands invoked so far.
    #[must_use]
    pub fn invoked(&self) -> Vec<ClusterCommand> {
        self.invoked.lock().clone()
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn check_reachable(&self) -> Result<(), ProtocolError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ProtocolError::Unreachable(format!(
                "cluster 0x{:04x}",
                self.cluster_id
            )));
        }
        Ok(())
    }

    fn apply(&self, command: &ClusterCommand) {
        match (self.cluster_id, command) {
            (on_off::ID, ClusterCommand::On) => self.set_attribute(on_off::ON_OFF, true),
            (on_off::ID, ClusterCommand::Off) => self.set_attribute(on_off::ON_OFF, false),
            (on_off::ID, ClusterCommand::Toggle) => {
                let current = self
                    .attributes
                    .read()
                    .get(&on_off::ON_OFF)
                    .and_then(AttributeValue::as_bool)
                    .unwrap_or(false);
                self.set_attribute(on_off::ON_OFF, !current);
            }
            (level_control::ID, ClusterCommand::MoveToLevel { level, .. }) => {
                self.set_attribute(level_control::CURRENT_LEVEL, *level);
            }
            (identify::ID, ClusterCommand::Identify { identify_time }) => {
                self.set_attribute(identify::IDENTIFY_TIME, *identify_time);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl ClusterClient for VirtualCluster {
    fn cluster_id(&self) -> ClusterId {
        self.cluster_id
    }

    async fn read_attribute(&self, attribute: AttributeId) -> Result<AttributeValue, ProtocolError> {
        self.check_reachable()?;
        self.attributes
            .read()
            .get(&attribute)
            .cloned()
            .ok_or(ProtocolError::UnsupportedAttribute {
                cluster: self.cluster_id,
                attribute,
            })
    }

    fn add_attribute_listener(
        &self,
        attribute: AttributeId,
        listener: AttributeListener,
    ) -> ListenerId {
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .insert(id, (attribute, ListenerEntry(listener)));
        id
    }

    fn remove_attribute_listener(&self, id: ListenerId) -> Result<(), ProtocolError> {
        self.check_reachable()?;
        self.listeners
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(ProtocolError::ListenerNotFound(id.value()))
    }

    async fn invoke(&self, command: ClusterCommand) -> Result<(), ProtocolError> {
        self.check_reachable()?;
        self.invoked.lock().push(command.clone());

        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(ProtocolError::CommandFailed {
                command: command.name().to_string(),
                reason: "FAILURE".to_string(),
            });
        }

        self.apply(&command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test]
    async fn read_unknown_attribute_fails() {
        let cluster = VirtualCluster::new(on_off::ID);
        let err = cluster.read_attribute(on_off::ON_OFF).await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedAttribute { .. }));
    }

    #[tokio::test]
    async fn invoke_applies_and_notifies() {
        let cluster = VirtualCluster::new(on_off::ID).with_attribute(on_off::ON_OFF, false);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        cluster.add_attribute_listener(
            on_off::ON_OFF,
            Arc::new(move |_, value| {
                assert_eq!(value, AttributeValue::Bool(true));
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        cluster.invoke(ClusterCommand::On).await.unwrap();
        // Same value again does not notify
        cluster.invoke(ClusterCommand::On).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cluster.invoked(), vec![ClusterCommand::On, ClusterCommand::On]);
    }

    #[tokio::test]
    async fn failing_commands_are_recorded_but_not_applied() {
        let cluster = VirtualCluster::new(on_off::ID).with_attribute(on_off::ON_OFF, false);
        cluster.fail_commands(true);

        assert!(cluster.invoke(ClusterCommand::On).await.is_err());
        assert_eq!(cluster.invoked().len(), 1);
        assert_eq!(
            cluster.read_attribute(on_off::ON_OFF).await.unwrap(),
            AttributeValue::Bool(false)
        );
    }

    #[test]
    fn remove_listener_on_unreachable_cluster_fails() {
        let cluster = VirtualCluster::new(on_off::ID);
        let id = cluster.add_attribute_listener(on_off::ON_OFF, Arc::new(|_, _| {}));
        cluster.set_unreachable(true);

        assert!(matches!(
            cluster.remove_attribute_listener(id),
            Err(ProtocolError::Unreachable(_))
        ));
    }

    #[test]
    fn remove_listener_twice_reports_not_found() {
        let cluster = VirtualCluster::new(on_off::ID);
        let id = cluster.add_attribute_listener(on_off::ON_OFF, Arc::new(|_, _| {}));

        assert!(cluster.remove_attribute_listener(id).is_ok());
        assert_eq!(
            cluster.remove_attribute_listener(id),
            Err(ProtocolError::ListenerNotFound(id.value()))
        );
        assert_eq!(cluster.listener_count(), 0);
    }
}
