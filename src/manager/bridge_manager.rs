// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge manager coordinating the sessions of all devices.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterContext, AdapterFactoryChain};
use crate::error::{Error, Result};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::Endpoint;
use crate::store::{StateStore, StateWrite};
use crate::subscription::SubscriptionRegistry;
use crate::types::{DeviceId, EndpointPath};

use super::BridgeConfig;
use super::device_session::{AttachReport, DeviceSession, SessionHandle};

/// Entry point of the bridge.
///
/// The manager turns discovered endpoints into adapters, feeds store writes
/// to the adapters that subscribed to them and tears everything down when a
/// device goes away. Each device runs in its own session task.
///
/// Cloning is cheap; clones share the same sessions.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use matter_state_sync::manager::{BridgeConfig, BridgeManager};
/// use matter_state_sync::protocol::clusters::on_off;
/// use matter_state_sync::protocol::{Endpoint, VirtualCluster};
/// use matter_state_sync::store::MemoryStore;
/// use matter_state_sync::types::EndpointPath;
///
/// #[tokio::main]
/// async fn main() -> matter_state_sync::Result<()> {
///     let store = Arc::new(MemoryStore::new());
///     let manager = BridgeManager::new(store.clone(), BridgeConfig::default());
///     let _feed = manager.spawn_store_feed();
///
///     let plug = Arc::new(VirtualCluster::new(on_off::ID).with_attribute(on_off::ON_OFF, false));
///     let endpoint = Endpoint::new(EndpointPath::new("4660", [1]), "On/Off Plug").with_cluster(plug);
///
///     let report = manager.endpoint_discovered(endpoint).await?;
///     assert_eq!(report.attached, vec!["OnOff"]);
///     assert!(store.state("matter.0.4660.1.onOff.state").is_some());
///
///     manager.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BridgeManager {
    store: Arc<dyn StateStore>,
    registry: Arc<SubscriptionRegistry>,
    chain: AdapterFactoryChain,
    config: Arc<BridgeConfig>,
    /// Running sessions, keyed by device.
    sessions: Arc<RwLock<HashMap<DeviceId, SessionHandle>>>,
    event_bus: EventBus,
    feed_cancel: CancellationToken,
}

impl BridgeManager {
    /// Creates a manager with the built-in adapters.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, config: BridgeConfig) -> Self {
        Self {
            store,
            registry: Arc::new(SubscriptionRegistry::new()),
            chain: AdapterFactoryChain::standard(),
            event_bus: EventBus::with_capacity(config.event_capacity),
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            feed_cancel: CancellationToken::new(),
        }
    }

    /// Replaces the adapter probes used for new endpoints.
    #[must_use]
    pub fn with_chain(mut self, chain: AdapterFactoryChain) -> Self {
        self.chain = chain;
        self
    }

    /// Uses an existing subscription registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SubscriptionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Subscribes to bridge events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the subscription registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the ids of all devices with a running session.
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Returns the number of devices with a running session.
    pub async fn device_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    // =========================================================================
    // Device lifecycle
    // =========================================================================

    /// Attaches adapters to a discovered endpoint.
    ///
    /// Starts the device's session on first use. Discovering an endpoint
    /// again replaces its adapters. Adapter failures are reported in the
    /// returned [`AttachReport`] and do not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the endpoint's container cannot be
    /// created (no adapter is attached then), or [`Error::SessionClosed`] if
    /// the device session stopped.
    pub async fn endpoint_discovered(&self, endpoint: Endpoint) -> Result<AttachReport> {
        let device_id = endpoint.path().device().clone();

        let client = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(device_id.clone())
                .or_insert_with(|| self.spawn_session(device_id))
                .client()
        };

        client.add_endpoint(endpoint).await
    }

    /// Tears down the adapters of one endpoint.
    ///
    /// Returns the number of adapters removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if the device has no session.
    pub async fn remove_endpoint(&self, path: &EndpointPath) -> Result<usize> {
        let client = self
            .sessions
            .read()
            .await
            .get(path.device())
            .map(SessionHandle::client)
            .ok_or(Error::DeviceNotFound)?;

        client.remove_endpoint(path.clone()).await
    }

    /// Removes a device, tearing down all of its adapters.
    ///
    /// Teardown completes even when the device is unreachable. Returns the
    /// number of adapters torn down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if the device has no session.
    pub async fn remove_device(&self, device_id: &DeviceId) -> Result<usize> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(device_id)
            .ok_or(Error::DeviceNotFound)?;

        let adapters = handle
            .shutdown(device_id, self.config.shutdown_timeout())
            .await;

        tracing::info!(%device_id, adapters, "Device removed");
        self.event_bus.publish(BridgeEvent::DeviceRemoved {
            device_id: device_id.clone(),
            adapters,
        });

        Ok(adapters)
    }

    /// Removes every device and stops the store feed.
    ///
    /// Returns the number of adapters torn down.
    pub async fn shutdown(&self) -> usize {
        self.feed_cancel.cancel();

        let mut total = 0;
        for device_id in self.device_ids().await {
            // Concurrent removal is fine, the device is gone either way
            if let Ok(adapters) = self.remove_device(&device_id).await {
                total += adapters;
            }
        }
        total
    }

    // =========================================================================
    // Store feed
    // =========================================================================

    /// Routes one store write to the handlers subscribed to its key.
    ///
    /// Writes outside the bridge's namespace are ignored. Returns the number
    /// of handlers invoked.
    pub fn handle_store_write(&self, write: &StateWrite) -> usize {
        let in_namespace = write
            .key
            .strip_prefix(self.config.namespace.as_str())
            .is_some_and(|rest| rest.starts_with('.'));
        if !in_namespace {
            return 0;
        }
        self.registry.dispatch(write)
    }

    /// Spawns the task forwarding store writes to [`handle_store_write`].
    ///
    /// The subscription is taken before this returns, so no write made
    /// afterwards is missed. The task ends on [`shutdown`](Self::shutdown) or
    /// when the store closes its channel.
    ///
    /// [`handle_store_write`]: Self::handle_store_write
    pub fn spawn_store_feed(&self) -> JoinHandle<()> {
        let mut writes = self.store.subscribe();
        let manager = self.clone();
        let cancel = self.feed_cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    received = writes.recv() => match received {
                        Ok(write) => {
                            manager.handle_store_write(&write);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Store feed lagged, writes were dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Store feed stopped");
        })
    }

    fn spawn_session(&self, device_id: DeviceId) -> SessionHandle {
        tracing::debug!(%device_id, "Starting device session");

        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);

        DeviceSession::spawn(
            device_id,
            move |events| AdapterContext::new(store, registry, config, events),
            self.chain.clone(),
            self.event_bus.clone(),
        )
    }
}

impl std::fmt::Debug for BridgeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeManager")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> BridgeManager {
        BridgeManager::new(Arc::new(MemoryStore::new()), BridgeConfig::default())
    }

    #[test]
    fn store_writes_outside_namespace_are_ignored() {
        let manager = manager();
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        manager
            .registry()
            .register("matter.01.n1.onOff.state", move |_: &StateWrite| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            });

        let foreign = StateWrite::pending("matter.01.n1.onOff.state", true);
        assert_eq!(manager.handle_store_write(&foreign), 0);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let manager = manager();

        assert!(matches!(
            manager.remove_device(&DeviceId::new("nope")).await,
            Err(Error::DeviceNotFound)
        ));
        assert!(matches!(
            manager.remove_endpoint(&EndpointPath::root("nope")).await,
            Err(Error::DeviceNotFound)
        ));
    }

    #[tokio::test]
    async fn empty_endpoint_still_starts_session() {
        let manager = manager();
        let endpoint = Endpoint::new(EndpointPath::root("n1"), "Bridge");

        let report = manager.endpoint_discovered(endpoint).await.unwrap();

        assert!(report.attached.is_empty());
        assert_eq!(report.skipped.len(), 6);
        assert_eq!(manager.device_count().await, 1);
        assert_eq!(manager.shutdown().await, 0);
        assert_eq!(manager.device_count().await, 0);
    }
}
