// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level Control cluster adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterBase, AdapterContext, AdapterFactory, ClusterAdapter, ClusterTag, LeafSpec,
};
use crate::error::Result;
use crate::protocol::clusters::FEATURE_MAP;
use crate::protocol::clusters::level_control::{self, LevelControlFeature};
use crate::protocol::{
    AttributeId, ClusterClient, ClusterCommand, ClusterId, Endpoint, LevelOptions,
};
use crate::types::{AttributeValue, LevelBounds, LevelPolicy, StateValue};

const LEVEL_LEAF: &str = "levelControl.level";

/// Reads an optional level bound, falling back to `default`.
async fn read_bound(client: &Arc<dyn ClusterClient>, attribute: AttributeId, default: u8) -> u8 {
    client
        .read_attribute(attribute)
        .await
        .ok()
        .and_then(|value| value.as_unsigned())
        .unwrap_or(default)
}

/// Mirrors the Level Control cluster as one read/write number leaf,
/// `levelControl.level`.
///
/// The leaf is bounded by the device's `MinLevel` / `MaxLevel`. Writes
/// outside the bounds are clamped or rejected according to the configured
/// [`LevelPolicy`] before any command is sent; in-range writes become a
/// `MoveToLevel` with zero transition time that executes even when the
/// device is off and does not touch color temperature.
#[derive(Debug)]
pub struct LevelControlAdapter {
    base: AdapterBase,
    client: Arc<dyn ClusterClient>,
    key: String,
    bounds: LevelBounds,
    policy: LevelPolicy,
}

impl LevelControlAdapter {
    /// Adapter name.
    pub const NAME: &'static str = "LevelControl";

    /// Options every `MoveToLevel` overrides.
    pub const OPTIONS_MASK: LevelOptions =
        LevelOptions::EXECUTE_IF_OFF.union(LevelOptions::COUPLE_COLOR_TEMP_TO_LEVEL);

    /// Values of the overridden options: execute while off, leave color
    /// temperature alone.
    pub const OPTIONS_OVERRIDE: LevelOptions = LevelOptions::EXECUTE_IF_OFF;

    /// Builds the adapter if `endpoint` exposes the Level Control cluster.
    ///
    /// Missing `MinLevel` / `MaxLevel` attributes fall back to 1 and 254.
    ///
    /// # Errors
    ///
    /// Returns an error if the current level cannot be read or the store
    /// rejects the leaf.
    pub async fn probe(ctx: &AdapterContext, endpoint: &Endpoint) -> Result<Option<Self>> {
        let Some(client) = endpoint.cluster(level_control::ID) else {
            return Ok(None);
        };

        let features = client
            .read_attribute(FEATURE_MAP)
            .await
            .ok()
            .and_then(|map| map.as_unsigned())
            .map_or(LevelControlFeature::empty(), LevelControlFeature::from_bits_truncate);
        let lighting = features.contains(LevelControlFeature::LIGHTING);
        let current = client.read_attribute(level_control::CURRENT_LEVEL).await?;
        let bounds = LevelBounds::new(
            read_bound(&client, level_control::MIN_LEVEL, LevelBounds::DEFAULT_MIN).await,
            read_bound(&client, level_control::MAX_LEVEL, LevelBounds::DEFAULT_MAX).await,
        );

        let base = AdapterBase::new(ctx, Self::NAME, endpoint.path());
        let role = if lighting { "level.dimmer" } else { "level" };

        let key = base
            .ensure_leaf_state(
                LEVEL_LEAF,
                &LeafSpec::number("Level", role)
                    .writable()
                    .with_range(f64::from(bounds.min()), f64::from(bounds.max())),
                ClusterTag::attribute(level_control::ID, level_control::CURRENT_LEVEL),
                Some(current.into()),
            )
            .await?;

        base.register_attribute_listener(&client, level_control::CURRENT_LEVEL);
        base.register_store_subscription(&key);

        tracing::info!(
            path = %endpoint.path(),
            min = bounds.min(),
            max = bounds.max(),
            "LevelControl adapter attached"
        );

        Ok(Some(Self {
            base,
            client,
            key,
            bounds,
            policy: ctx.config().level_policy,
        }))
    }

    /// Returns the device-reported level bounds.
    #[must_use]
    pub fn bounds(&self) -> LevelBounds {
        self.bounds
    }
}

#[async_trait]
impl ClusterAdapter for LevelControlAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn on_attribute_changed(
        &self,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<()> {
        if attribute != level_control::CURRENT_LEVEL {
            return Ok(());
        }
        self.base.publish(&self.key, value.into()).await
    }

    async fn on_store_write(&self, key: &str, value: StateValue) -> Result<()> {
        if key != self.key {
            return Ok(());
        }

        let requested = value.expect_f64()?;
        let level = self.bounds.resolve(requested, self.policy)?;
        if !self.bounds.contains(requested) {
            tracing::debug!(key = %key, requested, level, "Level adjusted to device bounds");
        }

        let command = ClusterCommand::MoveToLevel {
            level,
            transition_time: 0,
            options_mask: Self::OPTIONS_MASK,
            options_override: Self::OPTIONS_OVERRIDE,
        };
        self.base.invoke(&self.client, key, command).await
    }
}

/// Probe for [`LevelControlAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelControlFactory;

#[async_trait]
impl AdapterFactory for LevelControlFactory {
    fn name(&self) -> &'static str {
        LevelControlAdapter::NAME
    }

    fn cluster_id(&self) -> ClusterId {
        level_control::ID
    }

    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>> {
        Ok(LevelControlAdapter::probe(ctx, endpoint)
            .await?
            .map(|adapter| Arc::new(adapter) as Arc<dyn ClusterAdapter>))
    }
}
