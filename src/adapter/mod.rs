// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-cluster synchronization adapters.
//!
//! An adapter owns one endpoint/cluster pairing. On construction it creates
//! the state objects mirroring the cluster, seeds them with the device's
//! current values and registers two flows:
//!
//! - **device to store**: an attribute listener writes every change into the
//!   store as acknowledged
//! - **store to device**: a store subscription turns pending writes on
//!   writable leaves into cluster commands
//!
//! Listeners and subscriptions never call into the adapter directly. They
//! queue a [`SyncEvent`] to the owning device session, which processes the
//! events of one device in order.
//!
//! Adapters are built by [`AdapterFactory`] probes, run for each discovered
//! endpoint by an [`AdapterFactoryChain`].

mod base;
mod boolean_state;
mod factory;
mod identify;
mod leaf;
mod level_control;
mod occupancy_sensing;
mod on_off;
mod temperature_measurement;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use base::{AdapterBase, container_key, derive_namespace, ensure_container};
pub use boolean_state::{BooleanStateAdapter, BooleanStateFactory};
pub use factory::{AdapterFactory, AdapterFactoryChain, ProbeReport};
pub use identify::{IdentifyAdapter, IdentifyFactory};
pub use leaf::{ClusterTag, LeafSpec};
pub use level_control::{LevelControlAdapter, LevelControlFactory};
pub use occupancy_sensing::{OccupancySensingAdapter, OccupancySensingFactory};
pub use on_off::{OnOffAdapter, OnOffFactory};
pub use temperature_measurement::{TemperatureMeasurementAdapter, TemperatureMeasurementFactory};

use crate::error::Result;
use crate::manager::BridgeConfig;
use crate::protocol::AttributeId;
use crate::store::StateStore;
use crate::subscription::SubscriptionRegistry;
use crate::types::{AttributeValue, StateValue};

/// Identifier of an adapter instance, unique within its device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterId(u64);

impl AdapterId {
    /// Returns the raw id value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Adapter({})", self.0)
    }
}

/// Work queued to a device session by listeners and subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The device reported a new attribute value.
    AttributeChanged {
        /// Adapter that registered the listener.
        adapter: AdapterId,
        /// Changed attribute.
        attribute: AttributeId,
        /// New value.
        value: AttributeValue,
    },
    /// A pending (unacknowledged) value was written to the store.
    StoreWrite {
        /// Adapter that registered the subscription.
        adapter: AdapterId,
        /// Written key.
        key: String,
        /// Written value.
        value: StateValue,
    },
}

impl SyncEvent {
    /// Returns the adapter the event is addressed to.
    #[must_use]
    pub fn adapter(&self) -> AdapterId {
        match self {
            Self::AttributeChanged { adapter, .. } | Self::StoreWrite { adapter, .. } => *adapter,
        }
    }
}

/// Everything an adapter needs to construct itself.
///
/// One context exists per device session; its sender feeds that session's
/// event queue.
#[derive(Clone)]
pub struct AdapterContext {
    store: Arc<dyn StateStore>,
    registry: Arc<SubscriptionRegistry>,
    config: Arc<BridgeConfig>,
    events: mpsc::UnboundedSender<SyncEvent>,
    next_adapter: Arc<AtomicU64>,
}

impl AdapterContext {
    /// Creates a context whose adapters queue events on `events`.
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<SubscriptionRegistry>,
        config: Arc<BridgeConfig>,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            events,
            next_adapter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Returns the state store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Returns the subscription registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Returns the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<SyncEvent> {
        self.events.clone()
    }

    pub(crate) fn allocate_id(&self) -> AdapterId {
        AdapterId(self.next_adapter.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterContext")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// A constructed adapter for one endpoint/cluster pairing.
///
/// Implementations supply [`base`](Self::base) and the two sync flows; the
/// remaining methods have defaults built on the base.
#[async_trait]
pub trait ClusterAdapter: Send + Sync + fmt::Debug {
    /// Returns the shared adapter state.
    fn base(&self) -> &AdapterBase;

    /// Returns the adapter id.
    fn id(&self) -> AdapterId {
        self.base().id()
    }

    /// Returns the adapter name, e.g. `"OnOff"`.
    fn name(&self) -> &'static str {
        self.base().name()
    }

    /// Returns the state keys this adapter owns.
    fn keys(&self) -> Vec<String> {
        self.base().keys()
    }

    /// Mirrors a device-reported attribute change into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    async fn on_attribute_changed(&self, attribute: AttributeId, value: AttributeValue)
    -> Result<()>;

    /// Carries out a pending store write on the device.
    ///
    /// Read-only adapters never subscribe, so the default does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is unusable or the command fails.
    async fn on_store_write(&self, key: &str, value: StateValue) -> Result<()> {
        let _ = (key, value);
        Ok(())
    }

    /// Removes every registration this adapter made. Idempotent.
    fn teardown(&self) -> usize {
        self.base().teardown()
    }

    /// Routes a queued event to the matching flow.
    ///
    /// # Errors
    ///
    /// Propagates the error of the flow that handled the event.
    async fn handle(&self, event: SyncEvent) -> Result<()> {
        match event {
            SyncEvent::AttributeChanged {
                attribute, value, ..
            } => self.on_attribute_changed(attribute, value).await,
            SyncEvent::StoreWrite { key, value, .. } => self.on_store_write(&key, value).await,
        }
    }
}
