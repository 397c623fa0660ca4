// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On/Off cluster adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterBase, AdapterContext, AdapterFactory, ClusterAdapter, ClusterTag, LeafSpec,
};
use crate::error::Result;
use crate::protocol::clusters::on_off::{self, OnOffFeature};
use crate::protocol::clusters::FEATURE_MAP;
use crate::protocol::{AttributeId, ClusterClient, ClusterCommand, ClusterId, Endpoint};
use crate::types::{AttributeValue, StateValue};

const STATE_LEAF: &str = "onOff.state";

/// Mirrors the On/Off cluster as one read/write boolean leaf, `onOff.state`.
///
/// The leaf's role is `switch.light` for lighting devices and `switch`
/// otherwise, decided once from the feature map at construction.
#[derive(Debug)]
pub struct OnOffAdapter {
    base: AdapterBase,
    client: Arc<dyn ClusterClient>,
    key: String,
    lighting: bool,
}

impl OnOffAdapter {
    /// Adapter name.
    pub const NAME: &'static str = "OnOff";

    /// Builds the adapter if `endpoint` exposes the On/Off cluster.
    ///
    /// A missing feature map is treated as "no optional features".
    ///
    /// # Errors
    ///
    /// Returns an error if the on/off attribute cannot be read or the store
    /// rejects the leaf.
    pub async fn probe(ctx: &AdapterContext, endpoint: &Endpoint) -> Result<Option<Self>> {
        let Some(client) = endpoint.cluster(on_off::ID) else {
            return Ok(None);
        };

        let features = client
            .read_attribute(FEATURE_MAP)
            .await
            .ok()
            .and_then(|map| map.as_unsigned())
            .map_or(OnOffFeature::empty(), OnOffFeature::from_bits_truncate);
        let lighting = features.contains(OnOffFeature::LIGHTING);
        let current = client.read_attribute(on_off::ON_OFF).await?;

        let base = AdapterBase::new(ctx, Self::NAME, endpoint.path());
        let role = if lighting { "switch.light" } else { "switch" };

        let key = base
            .ensure_leaf_state(
                STATE_LEAF,
                &LeafSpec::boolean("On/Off", role).writable(),
                ClusterTag::attribute(on_off::ID, on_off::ON_OFF),
                Some(current.into()),
            )
            .await?;

        base.register_attribute_listener(&client, on_off::ON_OFF);
        base.register_store_subscription(&key);

        tracing::info!(path = %endpoint.path(), lighting, "OnOff adapter attached");

        Ok(Some(Self {
            base,
            client,
            key,
            lighting,
        }))
    }

    /// Returns `true` if the device reported the lighting feature.
    #[must_use]
    pub fn is_lighting(&self) -> bool {
        self.lighting
    }
}

#[async_trait]
impl ClusterAdapter for OnOffAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn on_attribute_changed(
        &self,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<()> {
        if attribute != on_off::ON_OFF {
            return Ok(());
        }
        self.base.publish(&self.key, value.into()).await
    }

    async fn on_store_write(&self, key: &str, value: StateValue) -> Result<()> {
        if key != self.key {
            return Ok(());
        }

        let command = if value.expect_bool()? {
            ClusterCommand::On
        } else {
            ClusterCommand::Off
        };
        self.base.invoke(&self.client, key, command).await
    }
}

/// Probe for [`OnOffAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OnOffFactory;

#[async_trait]
impl AdapterFactory for OnOffFactory {
    fn name(&self) -> &'static str {
        OnOffAdapter::NAME
    }

    fn cluster_id(&self) -> ClusterId {
        on_off::ID
    }

    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>> {
        Ok(OnOffAdapter::probe(ctx, endpoint)
            .await?
            .map(|adapter| Arc::new(adapter) as Arc<dyn ClusterAdapter>))
    }
}
