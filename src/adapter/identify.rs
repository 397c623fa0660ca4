// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identify cluster adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterBase, AdapterContext, AdapterFactory, ClusterAdapter, ClusterTag, LeafSpec,
};
use crate::error::Result;
use crate::protocol::clusters::identify;
use crate::protocol::{AttributeId, ClusterClient, ClusterCommand, ClusterId, Endpoint};
use crate::types::{AttributeValue, StateValue};

const TYPE_LEAF: &str = "identify.type";
const TIME_LEAF: &str = "identify.time";
const START_LEAF: &str = "identify.start";

/// Mirrors the Identify cluster.
///
/// Leaves:
///
/// - `identify.type` (read-only): the identification method, labelled
/// - `identify.time` (read-only): remaining identify time in seconds
/// - `identify.start` (write-only): writing `true` makes the device
///   identify itself for `identify.time` seconds, or for the configured
///   fallback when the time is unset or zero
#[derive(Debug)]
pub struct IdentifyAdapter {
    base: AdapterBase,
    client: Arc<dyn ClusterClient>,
    type_key: String,
    time_key: String,
    start_key: String,
    fallback_secs: u16,
}

impl IdentifyAdapter {
    /// Adapter name.
    pub const NAME: &'static str = "Identify";

    /// Builds the adapter if `endpoint` exposes the Identify cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if an attribute cannot be read or the store rejects
    /// a leaf.
    pub async fn probe(ctx: &AdapterContext, endpoint: &Endpoint) -> Result<Option<Self>> {
        let Some(client) = endpoint.cluster(identify::ID) else {
            return Ok(None);
        };

        let identify_type = client.read_attribute(identify::IDENTIFY_TYPE).await?;
        let identify_time = client.read_attribute(identify::IDENTIFY_TIME).await?;

        let base = AdapterBase::new(ctx, Self::NAME, endpoint.path());

        let type_key = base
            .ensure_leaf_state(
                TYPE_LEAF,
                &LeafSpec::number("Identify type", "state").with_states(identify::IDENTIFY_TYPES),
                ClusterTag::attribute(identify::ID, identify::IDENTIFY_TYPE),
                Some(identify_type.into()),
            )
            .await?;
        let time_key = base
            .ensure_leaf_state(
                TIME_LEAF,
                &LeafSpec::number("Identify time", "value").with_unit("s"),
                ClusterTag::attribute(identify::ID, identify::IDENTIFY_TIME),
                Some(identify_time.into()),
            )
            .await?;
        let start_key = base
            .ensure_leaf_state(
                START_LEAF,
                &LeafSpec::boolean("Identify", "button").write_only(),
                ClusterTag::command(identify::ID),
                None,
            )
            .await?;

        base.register_attribute_listener(&client, identify::IDENTIFY_TYPE);
        base.register_attribute_listener(&client, identify::IDENTIFY_TIME);
        base.register_store_subscription(&start_key);

        tracing::info!(path = %endpoint.path(), "Identify adapter attached");

        Ok(Some(Self {
            base,
            client,
            type_key,
            time_key,
            start_key,
            fallback_secs: ctx.config().identify_fallback_secs,
        }))
    }

    /// Returns the identify duration to use, in seconds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn duration(&self) -> Result<u16> {
        let stored = self
            .base
            .read_state(&self.time_key)
            .await?
            .and_then(|value| value.as_f64());

        Ok(match stored {
            Some(secs) if secs >= 1.0 => secs.round().min(f64::from(u16::MAX)) as u16,
            _ => self.fallback_secs,
        })
    }
}

#[async_trait]
impl ClusterAdapter for IdentifyAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn on_attribute_changed(
        &self,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<()> {
        let key = match attribute {
            identify::IDENTIFY_TYPE => &self.type_key,
            identify::IDENTIFY_TIME => &self.time_key,
            _ => return Ok(()),
        };
        self.base.publish(key, value.into()).await
    }

    async fn on_store_write(&self, key: &str, value: StateValue) -> Result<()> {
        if key != self.start_key || !value.expect_bool()? {
            return Ok(());
        }

        let identify_time = self.duration().await?;
        self.base
            .invoke(&self.client, key, ClusterCommand::Identify { identify_time })
            .await?;

        // Confirm the trigger
        self.base.publish(key, value).await
    }
}

/// Probe for [`IdentifyAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifyFactory;

#[async_trait]
impl AdapterFactory for IdentifyFactory {
    fn name(&self) -> &'static str {
        IdentifyAdapter::NAME
    }

    fn cluster_id(&self) -> ClusterId {
        identify::ID
    }

    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>> {
        Ok(IdentifyAdapter::probe(ctx, endpoint)
            .await?
            .map(|adapter| Arc::new(adapter) as Arc<dyn ClusterAdapter>))
    }
}
