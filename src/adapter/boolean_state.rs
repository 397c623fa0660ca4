// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boolean State cluster adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterBase, AdapterContext, AdapterFactory, ClusterAdapter, ClusterTag, LeafSpec,
};
use crate::error::Result;
use crate::protocol::clusters::boolean_state;
use crate::protocol::{AttributeId, ClusterId, Endpoint};
use crate::types::AttributeValue;

const STATE_LEAF: &str = "booleanState.state";

/// Mirrors the Boolean State cluster (contact sensors, leak detectors) as
/// one read-only boolean leaf, `booleanState.state`.
#[derive(Debug)]
pub struct BooleanStateAdapter {
    base: AdapterBase,
    key: String,
}

impl BooleanStateAdapter {
    /// Adapter name.
    pub const NAME: &'static str = "BooleanState";

    /// Builds the adapter if `endpoint` exposes the Boolean State cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or the store rejects
    /// the leaf.
    pub async fn probe(ctx: &AdapterContext, endpoint: &Endpoint) -> Result<Option<Self>> {
        let Some(client) = endpoint.cluster(boolean_state::ID) else {
            return Ok(None);
        };

        let current = client.read_attribute(boolean_state::STATE_VALUE).await?;
        let base = AdapterBase::new(ctx, Self::NAME, endpoint.path());

        let key = base
            .ensure_leaf_state(
                STATE_LEAF,
                &LeafSpec::boolean("State", "sensor"),
                ClusterTag::attribute(boolean_state::ID, boolean_state::STATE_VALUE),
                Some(current.into()),
            )
            .await?;

        base.register_attribute_listener(&client, boolean_state::STATE_VALUE);

        tracing::info!(path = %endpoint.path(), "BooleanState adapter attached");

        Ok(Some(Self { base, key }))
    }
}

#[async_trait]
impl ClusterAdapter for BooleanStateAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn on_attribute_changed(
        &self,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<()> {
        if attribute != boolean_state::STATE_VALUE {
            return Ok(());
        }
        self.base.publish(&self.key, value.into()).await
    }
}

/// Probe for [`BooleanStateAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanStateFactory;

#[async_trait]
impl AdapterFactory for BooleanStateFactory {
    fn name(&self) -> &'static str {
        BooleanStateAdapter::NAME
    }

    fn cluster_id(&self) -> ClusterId {
        boolean_state::ID
    }

    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>> {
        Ok(BooleanStateAdapter::probe(ctx, endpoint)
            .await?
            .map(|adapter| Arc::new(adapter) as Arc<dyn ClusterAdapter>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::BridgeConfig;
    use crate::protocol::VirtualCluster;
    use crate::store::MemoryStore;
    use crate::subscription::SubscriptionRegistry;
    use crate::types::{EndpointPath, StateValue};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn read_only_leaf_without_subscription() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let ctx = AdapterContext::new(
            store.clone(),
            registry.clone(),
            Arc::new(BridgeConfig::default()),
            tx,
        );
        let cluster = Arc::new(
            VirtualCluster::new(boolean_state::ID).with_attribute(boolean_state::STATE_VALUE, true),
        );
        let endpoint =
            Endpoint::new(EndpointPath::new("n7", [3]), "Contact Sensor").with_cluster(cluster.clone());

        let adapter = BooleanStateAdapter::probe(&ctx, &endpoint)
            .await
            .unwrap()
            .unwrap();

        let object = store.object("matter.0.n7.3.booleanState.state").unwrap();
        assert!(object.common.read);
        assert!(!object.common.write);
        assert!(registry.is_empty());
        assert_eq!(cluster.listener_count(), 1);

        adapter
            .on_attribute_changed(boolean_state::STATE_VALUE, false.into())
            .await
            .unwrap();
        assert_eq!(
            store.state("matter.0.n7.3.booleanState.state").unwrap().value,
            StateValue::Bool(false)
        );
    }
}
