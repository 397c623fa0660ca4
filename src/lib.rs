// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `matter_state_sync` - keeps Matter device clusters and a home-automation
//! state store in sync.
//!
//! A Matter device is a tree of endpoints exposing clusters (On/Off, Level
//! Control, ...). A home-automation state store holds objects under dotted
//! keys, each value flagged as acknowledged (confirmed device truth) or
//! pending (a user request). This library sits between the two:
//!
//! - it creates one state leaf per mirrored attribute, idempotently
//! - it writes device-reported changes into the store as acknowledged
//! - it turns pending writes on writable leaves into cluster commands
//! - it removes every listener and subscription when a device goes away
//!
//! # Supported Clusters
//!
//! | Cluster                | Leaves                                          |
//! |------------------------|-------------------------------------------------|
//! | Identify               | `identify.type`, `identify.time`, `identify.start` |
//! | On/Off                 | `onOff.state`                                   |
//! | Level Control          | `levelControl.level`                            |
//! | Boolean State          | `booleanState.state`                            |
//! | Occupancy Sensing      | `occupancy.occupied`                            |
//! | Temperature Measurement| `temperature.value`                             |
//!
//! Further clusters plug in through [`adapter::AdapterFactory`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use matter_state_sync::manager::{BridgeConfig, BridgeManager};
//! use matter_state_sync::protocol::clusters::{level_control, on_off};
//! use matter_state_sync::protocol::{Endpoint, VirtualCluster};
//! use matter_state_sync::store::MemoryStore;
//! use matter_state_sync::types::EndpointPath;
//!
//! #[tokio::main]
//! async fn main() -> matter_state_sync::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let manager = BridgeManager::new(store.clone(), BridgeConfig::default());
//!     let _feed = manager.spawn_store_feed();
//!
//!     let light = Endpoint::new(EndpointPath::new("4660", [1]), "Dimmable Light")
//!         .with_cluster(Arc::new(
//!             VirtualCluster::new(on_off::ID).with_attribute(on_off::ON_OFF, false),
//!         ))
//!         .with_cluster(Arc::new(
//!             VirtualCluster::new(level_control::ID)
//!                 .with_attribute(level_control::CURRENT_LEVEL, 128u8),
//!         ));
//!
//!     let report = manager.endpoint_discovered(light).await?;
//!     assert_eq!(report.attached, vec!["OnOff", "LevelControl"]);
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`store`]: the state-store interface and an in-memory store
//! - [`protocol`]: the cluster-client interface and an in-process cluster
//! - [`subscription`]: the registry routing store writes to handlers
//! - [`adapter`]: per-cluster adapters and the probe chain building them
//! - [`manager`]: device sessions and the [`BridgeManager`](manager::BridgeManager)
//! - [`event`]: lifecycle and failure events

pub mod adapter;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod store;
pub mod subscription;
pub mod types;

pub use adapter::{AdapterFactory, AdapterFactoryChain, ClusterAdapter};
pub use error::{Error, ProtocolError, Result, StoreError, ValueError};
pub use event::{BridgeEvent, EventBus};
pub use manager::{AttachReport, BridgeConfig, BridgeManager};
pub use protocol::{ClusterClient, ClusterCommand, Endpoint};
pub use store::{MemoryStore, StateStore, StateWrite};
pub use subscription::{SubscriptionId, SubscriptionRegistry};
pub use types::{AttributeValue, DeviceId, EndpointPath, StateValue};
