// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for bridge lifecycle and failures.
//!
//! The [`EventBus`] uses tokio's broadcast channel so several observers
//! (a UI, a log sink, tests) can follow what the bridge does.
//!
//! # Examples
//!
//! ```
//! use matter_state_sync::event::{BridgeEvent, EventBus};
//! use matter_state_sync::types::EndpointPath;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(BridgeEvent::EndpointFailed {
//!     path: EndpointPath::new("4660", [1]),
//!     error: "store unavailable".to_string(),
//! });
//! ```

mod bridge_event;
mod event_bus;

pub use bridge_event::BridgeEvent;
pub use event_bus::{DEFAULT_EVENT_CAPACITY, EventBus};
