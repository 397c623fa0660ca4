// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Occupancy Sensing cluster adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterBase, AdapterContext, AdapterFactory, ClusterAdapter, ClusterTag, LeafSpec,
};
use crate::error::Result;
use crate::protocol::clusters::occupancy_sensing::{self, Occupancy};
use crate::protocol::{AttributeId, ClusterId, Endpoint};
use crate::types::{AttributeValue, StateValue};

const OCCUPIED_LEAF: &str = "occupancy.occupied";

fn occupied(value: &AttributeValue) -> StateValue {
    match value {
        AttributeValue::Null => StateValue::Null,
        other => StateValue::Bool(
            other
                .as_unsigned()
                .map(Occupancy::from_bits_truncate)
                .is_some_and(|bitmap| bitmap.contains(Occupancy::OCCUPIED)),
        ),
    }
}

/// Mirrors the Occupancy Sensing cluster as one read-only boolean leaf,
/// `occupancy.occupied`.
#[derive(Debug)]
pub struct OccupancySensingAdapter {
    base: AdapterBase,
    key: String,
}

impl OccupancySensingAdapter {
    /// Adapter name.
    pub const NAME: &'static str = "OccupancySensing";

    /// Builds the adapter if `endpoint` exposes the Occupancy Sensing
    /// cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the occupancy bitmap cannot be read or the store
    /// rejects the leaf.
    pub async fn probe(ctx: &AdapterContext, endpoint: &Endpoint) -> Result<Option<Self>> {
        let Some(client) = endpoint.cluster(occupancy_sensing::ID) else {
            return Ok(None);
        };

        let current = client.read_attribute(occupancy_sensing::OCCUPANCY).await?;
        let base = AdapterBase::new(ctx, Self::NAME, endpoint.path());

        let key = base
            .ensure_leaf_state(
                OCCUPIED_LEAF,
                &LeafSpec::boolean("Occupied", "sensor.motion"),
                ClusterTag::attribute(occupancy_sensing::ID, occupancy_sensing::OCCUPANCY),
                Some(occupied(&current)),
            )
            .await?;

        base.register_attribute_listener(&client, occupancy_sensing::OCCUPANCY);

        tracing::info!(path = %endpoint.path(), "OccupancySensing adapter attached");

        Ok(Some(Self { base, key }))
    }
}

#[async_trait]
impl ClusterAdapter for OccupancySensingAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn on_attribute_changed(
        &self,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<()> {
        if attribute != occupancy_sensing::OCCUPANCY {
            return Ok(());
        }
        self.base.publish(&self.key, occupied(&value)).await
    }
}

/// Probe for [`OccupancySensingAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancySensingFactory;

#[async_trait]
impl AdapterFactory for OccupancySensingFactory {
    fn name(&self) -> &'static str {
        OccupancySensingAdapter::NAME
    }

    fn cluster_id(&self) -> ClusterId {
        occupancy_sensing::ID
    }

    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>> {
        Ok(OccupancySensingAdapter::probe(ctx, endpoint)
            .await?
            .map(|adapter| Arc::new(adapter) as Arc<dyn ClusterAdapter>))
    }
}
