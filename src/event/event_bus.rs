// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast fan-out of [`BridgeEvent`]s.

use tokio::sync::broadcast;

use super::BridgeEvent;

/// Number of events a subscriber may fall behind before it lags.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fans bridge events out to any number of observers.
///
/// Backed by a tokio broadcast channel: an observer that falls behind
/// loses the oldest events and sees `RecvError::Lagged`, while the
/// publishing session never waits. Clones share one channel.
///
/// # Examples
///
/// ```
/// use matter_state_sync::event::{BridgeEvent, EventBus};
/// use matter_state_sync::types::DeviceId;
///
/// let bus = EventBus::new();
/// let mut observer = bus.subscribe();
///
/// let delivered = bus.publish(BridgeEvent::DeviceRemoved {
///     device_id: DeviceId::new("4660"),
///     adapters: 2,
/// });
/// assert_eq!(delivered, 1);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a bus holding [`DEFAULT_EVENT_CAPACITY`] events.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a bus holding `capacity` events per observer (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a receiver for events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Hands `event` to every observer and returns how many received it.
    ///
    /// Events nobody observes are dropped.
    pub fn publish(&self, event: BridgeEvent) -> usize {
        match self.sender.send(event) {
            Ok(observers) => observers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(device_id = %event.device_id(), "No observers for bridge event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
