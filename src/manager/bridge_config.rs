// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::DEFAULT_EVENT_CAPACITY;
use crate::types::LevelPolicy;

/// Configuration shared by every device session.
///
/// Every field has a default, so a host only needs to set what it changes.
/// The configuration can be built in code or loaded from JSON.
///
/// # Examples
///
/// ```
/// use matter_state_sync::manager::BridgeConfig;
/// use matter_state_sync::types::LevelPolicy;
///
/// let config = BridgeConfig::default()
///     .with_namespace("matter.1")
///     .with_level_policy(LevelPolicy::Reject);
///
/// let loaded = BridgeConfig::from_json(r#"{ "namespace": "matter.1", "levelPolicy": "reject" }"#)
///     .unwrap();
/// assert_eq!(loaded, config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Root of every key the bridge writes, e.g. `matter.0`.
    pub namespace: String,
    /// Identify duration used when the stored identify time is unset or 0.
    pub identify_fallback_secs: u16,
    /// Handling of level writes outside the device-reported bounds.
    pub level_policy: LevelPolicy,
    /// Capacity of the bridge event channel.
    pub event_capacity: usize,
    /// Time a device session gets to tear down before it is cancelled.
    pub shutdown_timeout_ms: u64,
}

impl BridgeConfig {
    /// Default key root.
    pub const DEFAULT_NAMESPACE: &'static str = "matter.0";

    /// Default identify duration in seconds.
    pub const DEFAULT_IDENTIFY_SECS: u16 = 10;

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is not valid JSON or has
    /// fields of the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    /// Sets the key root.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the identify fallback duration.
    #[must_use]
    pub fn with_identify_fallback_secs(mut self, secs: u16) -> Self {
        self.identify_fallback_secs = secs;
        self
    }

    /// Sets the out-of-range level policy.
    #[must_use]
    pub fn with_level_policy(mut self, policy: LevelPolicy) -> Self {
        self.level_policy = policy;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the session shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the session shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: Self::DEFAULT_NAMESPACE.to_string(),
            identify_fallback_secs: Self::DEFAULT_IDENTIFY_SECS,
            level_policy: LevelPolicy::Clamp,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            shutdown_timeout_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.namespace, "matter.0");
        assert_eq!(config.identify_fallback_secs, 10);
        assert_eq!(config.level_policy, LevelPolicy::Clamp);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(BridgeConfig::from_json("{}").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = BridgeConfig::from_json(r#"{ "identifyFallbackSecs": "ten" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let config = BridgeConfig::default()
            .with_identify_fallback_secs(3)
            .with_shutdown_timeout(Duration::from_millis(500));
        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("\"shutdownTimeoutMs\":500"));
        assert_eq!(BridgeConfig::from_json(&json).unwrap(), config);
    }
}
