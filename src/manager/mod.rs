// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge manager and device sessions.
//!
//! # Overview
//!
//! The [`BridgeManager`] is the component a host application talks to:
//!
//! - **Endpoint lifecycle**: attach adapters when the protocol layer reports
//!   an endpoint, replace them on re-discovery, tear them down on removal
//! - **Store feed**: forward the store's write notifications to the
//!   subscribed adapters
//! - **Device isolation**: one session task per device, so a wedged device
//!   cannot delay the others
//! - **Event system**: subscribe to [`BridgeEvent`](crate::event::BridgeEvent)s
//!   via a broadcast channel
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use matter_state_sync::event::BridgeEvent;
//! use matter_state_sync::manager::{BridgeConfig, BridgeManager};
//! use matter_state_sync::store::MemoryStore;
//!
//! # async fn example() {
//! let manager = BridgeManager::new(Arc::new(MemoryStore::new()), BridgeConfig::default());
//! let _feed = manager.spawn_store_feed();
//! let mut events = manager.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if event.is_failure() {
//!             println!("Sync problem on {}: {:?}", event.device_id(), event);
//!         }
//!     }
//! });
//! # }
//! ```

mod bridge_config;
mod bridge_manager;
mod device_session;

pub use bridge_config::BridgeConfig;
pub use bridge_manager::BridgeManager;
pub use device_session::AttachReport;
