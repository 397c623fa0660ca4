// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared adapter logic: keys, idempotent object creation, registration
//! bookkeeping and teardown.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::leaf::{ClusterTag, LeafSpec};
use super::{AdapterContext, AdapterId, SyncEvent};
use crate::error::Result;
use crate::protocol::{AttributeId, ClusterClient, ClusterCommand, ListenerId};
use crate::store::{ObjectDefinition, StateStore, StateWrite};
use crate::subscription::{SubscriptionId, SubscriptionRegistry};
use crate::types::{DeviceId, EndpointPath, StateValue};

/// Returns the namespace prefix of an endpoint.
///
/// Empty for the root endpoint; otherwise the endpoint's child indices
/// joined with `.` plus a trailing `.`. Pure function of the path.
///
/// # Examples
///
/// ```
/// use matter_state_sync::adapter::derive_namespace;
/// use matter_state_sync::types::EndpointPath;
///
/// assert_eq!(derive_namespace(&EndpointPath::root("4660")), "");
/// assert_eq!(derive_namespace(&EndpointPath::new("4660", [2])), "2.");
/// ```
#[must_use]
pub fn derive_namespace(path: &EndpointPath) -> String {
    path.namespace()
}

/// Returns the key of the container for `device` / `prefix`.
///
/// The device container sits at `{namespace}.{device}`; endpoint channels
/// below it at `{namespace}.{device}.{prefix}` without the trailing `.`.
/// The device id is rendered with [`DeviceId::key_segment`].
#[must_use]
pub fn container_key(namespace: &str, device: &DeviceId, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('.');
    let device = device.key_segment();
    if prefix.is_empty() {
        format!("{namespace}.{device}")
    } else {
        format!("{namespace}.{device}.{prefix}")
    }
}

/// Creates the container for `device` / `prefix` unless it already exists.
///
/// Root containers (empty prefix) are device objects, all others are
/// channels. An existing object is left untouched. Returns the key.
///
/// # Errors
///
/// Returns [`Error::Store`](crate::Error::Store) if the store cannot be
/// read or rejects the object.
pub async fn ensure_container(
    store: &dyn StateStore,
    namespace: &str,
    device: &DeviceId,
    prefix: &str,
    display_name_hint: &str,
) -> Result<String> {
    let key = container_key(namespace, device, prefix);

    if store.get_object(&key).await?.is_some() {
        return Ok(key);
    }

    let object = if prefix.is_empty() {
        ObjectDefinition::device(display_name_hint)
    } else {
        ObjectDefinition::channel(display_name_hint)
    };
    store.set_object(&key, object).await?;
    tracing::debug!(key = %key, "Created container");

    Ok(key)
}

/// A registration made through an adapter, kept so teardown can undo it.
enum Registration {
    Store {
        key: String,
        id: SubscriptionId,
    },
    Attribute {
        client: Arc<dyn ClusterClient>,
        attribute: AttributeId,
        id: ListenerId,
    },
}

/// State shared by every cluster adapter.
///
/// The base owns the adapter's identity, its key namespace and the list of
/// registrations made on its behalf. Every store subscription and protocol
/// listener goes through the base, so [`teardown`](Self::teardown) removes
/// exactly what this adapter added and nothing else.
///
/// Dropping the base tears it down.
pub struct AdapterBase {
    id: AdapterId,
    name: &'static str,
    path: EndpointPath,
    namespace: String,
    prefix: String,
    store: Arc<dyn StateStore>,
    registry: Arc<SubscriptionRegistry>,
    events: mpsc::UnboundedSender<SyncEvent>,
    keys: Mutex<Vec<String>>,
    registrations: Mutex<Vec<Registration>>,
}

impl AdapterBase {
    /// Creates the base for an adapter named `name` serving `path`.
    #[must_use]
    pub fn new(ctx: &AdapterContext, name: &'static str, path: &EndpointPath) -> Self {
        Self {
            id: ctx.allocate_id(),
            name,
            path: path.clone(),
            namespace: ctx.config().namespace.clone(),
            prefix: derive_namespace(path),
            store: Arc::clone(ctx.store()),
            registry: Arc::clone(ctx.registry()),
            events: ctx.sender(),
            keys: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the adapter id.
    #[must_use]
    pub fn id(&self) -> AdapterId {
        self.id
    }

    /// Returns the adapter name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the endpoint path.
    #[must_use]
    pub fn path(&self) -> &EndpointPath {
        &self.path
    }

    /// Returns the endpoint's namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the fully-qualified key of a leaf.
    #[must_use]
    pub fn key(&self, leaf: &str) -> String {
        format!(
            "{}.{}.{}{}",
            self.namespace,
            self.path.device(),
            self.prefix,
            leaf
        )
    }

    /// Returns every leaf key ensured so far.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }

    /// Creates this endpoint's container unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on store failure.
    pub async fn ensure_container(&self, display_name_hint: &str) -> Result<String> {
        ensure_container(
            self.store.as_ref(),
            &self.namespace,
            self.path.device(),
            &self.prefix,
            display_name_hint,
        )
        .await
    }

    /// Creates a leaf object unless it exists, then seeds its value.
    ///
    /// The object is only written if absent, so existing metadata is never
    /// replaced. If `current` is given and the store holds no value or a
    /// different one, `current` is written as acknowledged. Returns the
    /// fully-qualified key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on store failure.
    pub async fn ensure_leaf_state(
        &self,
        leaf: &str,
        spec: &LeafSpec,
        tag: ClusterTag,
        current: Option<StateValue>,
    ) -> Result<String> {
        let key = self.key(leaf);

        if self.store.get_object(&key).await?.is_none() {
            self.store.set_object(&key, spec.to_object(tag)).await?;
            tracing::debug!(key = %key, role = spec.role(), "Created state");
        }

        if let Some(value) = current {
            let stored = self.store.get_state(&key).await?;
            if stored.as_ref().map(|record| &record.value) != Some(&value) {
                tracing::debug!(key = %key, value = %value, "Seeding state");
                self.store.set_state(&key, value, true).await?;
            }
        }

        {
            let mut keys = self.keys.lock();
            if !keys.contains(&key) {
                keys.push(key.clone());
            }
        }

        Ok(key)
    }

    /// Writes a device-reported value as acknowledged.
    ///
    /// Skipped only when the store already holds the same value as
    /// acknowledged; a pending user write with the same value is confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on store failure.
    pub async fn publish(&self, key: &str, value: StateValue) -> Result<()> {
        if let Some(record) = self.store.get_state(key).await?
            && record.ack
            && record.value == value
        {
            return Ok(());
        }

        tracing::debug!(key = %key, value = %value, "Updating state from device");
        self.store.set_state(key, value, true).await?;
        Ok(())
    }

    /// Reads the current value of a leaf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on store failure.
    pub async fn read_state(&self, key: &str) -> Result<Option<StateValue>> {
        Ok(self.store.get_state(key).await?.map(|record| record.value))
    }

    /// Subscribes to pending writes on `key`.
    ///
    /// Acknowledged writes are dropped in the handler: they are the bridge's
    /// own echo of device state, not user intent. Pending writes are queued
    /// to the device session.
    pub fn register_store_subscription(&self, key: &str) -> SubscriptionId {
        let adapter = self.id;
        let events = self.events.clone();

        let id = self.registry.register(key, move |write: &StateWrite| {
            if write.ack {
                return;
            }
            // Receiver gone means the session is shutting down
            let _ = events.send(SyncEvent::StoreWrite {
                adapter,
                key: write.key.clone(),
                value: write.value.clone(),
            });
        });

        self.registrations.lock().push(Registration::Store {
            key: key.to_string(),
            id,
        });
        id
    }

    /// Listens for changes of `attribute` on `client`.
    ///
    /// Changes are queued to the device session.
    pub fn register_attribute_listener(
        &self,
        client: &Arc<dyn ClusterClient>,
        attribute: AttributeId,
    ) -> ListenerId {
        let adapter = self.id;
        let events = self.events.clone();

        let id = client.add_attribute_listener(
            attribute,
            Arc::new(move |attribute, value| {
                let _ = events.send(SyncEvent::AttributeChanged {
                    adapter,
                    attribute,
                    value,
                });
            }),
        );

        self.registrations.lock().push(Registration::Attribute {
            client: Arc::clone(client),
            attribute,
            id,
        });
        id
    }

    /// Invokes a command, logging failures.
    ///
    /// The store value that triggered the command is left as written; the
    /// next device report is the source of truth.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`](crate::Error::Protocol) if the device
    /// rejects the command or cannot be reached.
    pub async fn invoke(
        &self,
        client: &Arc<dyn ClusterClient>,
        key: &str,
        command: ClusterCommand,
    ) -> Result<()> {
        let name = command.name();
        tracing::debug!(adapter = self.name, key = %key, command = name, "Invoking command");

        if let Err(e) = client.invoke(command).await {
            tracing::warn!(
                adapter = self.name,
                key = %key,
                command = name,
                error = %e,
                "Command failed, keeping store value"
            );
            return Err(e.into());
        }
        Ok(())
    }

    /// Returns the number of live registrations.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Removes every registration this adapter made.
    ///
    /// Safe to call repeatedly: the registration list is drained, so later
    /// calls find nothing to do. Failures to remove a protocol listener
    /// (device gone, listener already removed) are logged and skipped.
    /// Returns the number of registrations processed.
    pub fn teardown(&self) -> usize {
        let registrations = std::mem::take(&mut *self.registrations.lock());
        let count = registrations.len();

        for registration in registrations {
            match registration {
                Registration::Store { key, id } => {
                    if !self.registry.unregister(id) {
                        tracing::debug!(key = %key, %id, "Subscription already removed");
                    }
                }
                Registration::Attribute {
                    client,
                    attribute,
                    id,
                } => {
                    if let Err(e) = client.remove_attribute_listener(id) {
                        tracing::warn!(
                            adapter = self.name,
                            path = %self.path,
                            attribute,
                            error = %e,
                            "Failed to remove attribute listener"
                        );
                    }
                }
            }
        }

        if count > 0 {
            tracing::debug!(adapter = self.name, path = %self.path, count, "Adapter torn down");
        }
        count
    }
}

impl Drop for AdapterBase {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for AdapterBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("registrations", &self.registration_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::BridgeConfig;
    use crate::protocol::VirtualCluster;
    use crate::protocol::clusters::on_off;
    use crate::store::MemoryStore;
    use crate::types::AttributeValue;

    fn context(store: Arc<MemoryStore>) -> (AdapterContext, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = AdapterContext::new(
            store,
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(BridgeConfig::default()),
            tx,
        );
        (ctx, rx)
    }

    fn spec() -> LeafSpec {
        LeafSpec::boolean("On", "switch").writable()
    }

    fn tag() -> ClusterTag {
        ClusterTag::attribute(on_off::ID, on_off::ON_OFF)
    }

    #[test]
    fn container_keys() {
        let device = DeviceId::new("n1");
        assert_eq!(container_key("matter.0", &device, ""), "matter.0.n1");
        assert_eq!(container_key("matter.0", &device, "1.2."), "matter.0.n1.1.2");
    }

    #[test]
    fn dotted_device_ids_stay_one_segment() {
        let dotted = container_key("matter.0", &DeviceId::new("a.b"), "1.");
        let underscored = container_key("matter.0", &DeviceId::new("a_b"), "1.");

        assert_eq!(dotted, "matter.0.a%2Eb.1");
        assert_eq!(underscored, "matter.0.a_b.1");
    }

    #[test]
    fn namespace_is_deterministic() {
        let path = EndpointPath::new("n1", [4, 1]);
        let first = derive_namespace(&path);
        for _ in 0..10 {
            assert_eq!(derive_namespace(&path.clone()), first);
        }
        assert_eq!(first, "4.1.");
    }

    #[tokio::test]
    async fn leaf_key_joins_namespace_device_prefix_leaf() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(store);
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::new("n1", [1]));

        assert_eq!(base.key("onOff.state"), "matter.0.n1.1.onOff.state");
    }

    #[tokio::test]
    async fn ensure_container_writes_once() {
        let store = Arc::new(MemoryStore::new());
        let device = DeviceId::new("n1");

        ensure_container(store.as_ref(), "matter.0", &device, "1.", "Light")
            .await
            .unwrap();
        ensure_container(store.as_ref(), "matter.0", &device, "1.", "Renamed")
            .await
            .unwrap();

        assert_eq!(store.object_writes(), 1);
        assert_eq!(store.object("matter.0.n1.1").unwrap().common.name, "Light");
    }

    #[tokio::test]
    async fn ensure_leaf_state_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(Arc::clone(&store));
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));

        let key = base
            .ensure_leaf_state("onOff.state", &spec(), tag(), Some(true.into()))
            .await
            .unwrap();
        base.ensure_leaf_state("onOff.state", &spec(), tag(), Some(true.into()))
            .await
            .unwrap();

        assert_eq!(key, "matter.0.n1.onOff.state");
        assert_eq!(store.object_writes(), 1);
        assert_eq!(store.state_writes(), 1);
        assert_eq!(base.keys(), vec![key]);
    }

    #[tokio::test]
    async fn ensure_leaf_state_keeps_existing_metadata_but_corrects_value() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(Arc::clone(&store));
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));
        let key = base.key("onOff.state");

        let mut custom = spec().to_object(tag());
        custom.common.name = "Kitchen".to_string();
        store.set_object(&key, custom).await.unwrap();
        store.set_state(&key, false.into(), true).await.unwrap();

        base.ensure_leaf_state("onOff.state", &spec(), tag(), Some(true.into()))
            .await
            .unwrap();

        assert_eq!(store.object(&key).unwrap().common.name, "Kitchen");
        assert_eq!(store.state(&key).unwrap().value, StateValue::Bool(true));
        assert!(store.state(&key).unwrap().ack);
    }

    #[tokio::test]
    async fn publish_confirms_pending_value() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(Arc::clone(&store));
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));
        let key = base.key("onOff.state");

        store.set_state(&key, true.into(), false).await.unwrap();
        base.publish(&key, true.into()).await.unwrap();
        assert!(store.state(&key).unwrap().ack);

        let writes = store.state_writes();
        base.publish(&key, true.into()).await.unwrap();
        assert_eq!(store.state_writes(), writes);
    }

    #[tokio::test]
    async fn store_subscription_drops_acknowledged_writes() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, mut rx) = context(store);
        let registry = Arc::clone(ctx.registry());
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));
        let key = base.key("onOff.state");

        base.register_store_subscription(&key);

        registry.dispatch(&StateWrite::acknowledged(&key, true));
        assert!(rx.try_recv().is_err());

        registry.dispatch(&StateWrite::pending(&key, true));
        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            SyncEvent::StoreWrite {
                adapter: base.id(),
                key,
                value: StateValue::Bool(true),
            }
        );
    }

    #[tokio::test]
    async fn attribute_listener_queues_changes() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, mut rx) = context(store);
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));
        let cluster = Arc::new(VirtualCluster::new(on_off::ID).with_attribute(on_off::ON_OFF, false));
        let client: Arc<dyn ClusterClient> = cluster.clone();

        base.register_attribute_listener(&client, on_off::ON_OFF);
        cluster.set_attribute(on_off::ON_OFF, true);

        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::AttributeChanged {
                adapter: base.id(),
                attribute: on_off::ON_OFF,
                value: AttributeValue::Bool(true),
            }
        );
    }

    #[tokio::test]
    async fn teardown_is_idempotent_and_survives_dead_device() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(store);
        let registry = Arc::clone(ctx.registry());
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));
        let cluster = Arc::new(VirtualCluster::new(on_off::ID));
        let client: Arc<dyn ClusterClient> = cluster.clone();

        base.register_attribute_listener(&client, on_off::ON_OFF);
        base.register_store_subscription(&base.key("onOff.state"));
        cluster.set_unreachable(true);

        assert_eq!(base.teardown(), 2);
        assert!(registry.is_empty());
        assert_eq!(base.teardown(), 0);
    }

    #[tokio::test]
    async fn teardown_tolerates_externally_removed_subscription() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(store);
        let registry = Arc::clone(ctx.registry());
        let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));

        let id = base.register_store_subscription(&base.key("onOff.state"));
        registry.unregister(id);

        assert_eq!(base.teardown(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn drop_tears_down() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, _rx) = context(store);
        let registry = Arc::clone(ctx.registry());
        let cluster = Arc::new(VirtualCluster::new(on_off::ID));
        let client: Arc<dyn ClusterClient> = cluster.clone();

        {
            let base = AdapterBase::new(&ctx, "OnOff", &EndpointPath::root("n1"));
            base.register_attribute_listener(&client, on_off::ON_OFF);
            base.register_store_subscription(&base.key("onOff.state"));
        }

        assert!(registry.is_empty());
        assert_eq!(cluster.listener_count(), 0);
    }
}
