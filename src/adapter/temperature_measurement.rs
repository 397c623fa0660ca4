// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature Measurement cluster adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterBase, AdapterContext, AdapterFactory, ClusterAdapter, ClusterTag, LeafSpec,
};
use crate::error::Result;
use crate::protocol::clusters::temperature_measurement;
use crate::protocol::{AttributeId, ClusterId, Endpoint};
use crate::types::{AttributeValue, StateValue};

const VALUE_LEAF: &str = "temperature.value";

/// Converts `MeasuredValue` (hundredths of a degree) to degrees Celsius.
#[allow(clippy::cast_precision_loss)]
fn celsius(value: &AttributeValue) -> StateValue {
    value
        .as_i64()
        .map_or(StateValue::Null, |centi| StateValue::Number(centi as f64 / 100.0))
}

/// Mirrors the Temperature Measurement cluster as one read-only number leaf,
/// `temperature.value`, in °C. An unknown measurement stays null.
#[derive(Debug)]
pub struct TemperatureMeasurementAdapter {
    base: AdapterBase,
    key: String,
}

impl TemperatureMeasurementAdapter {
    /// Adapter name.
    pub const NAME: &'static str = "TemperatureMeasurement";

    /// Builds the adapter if `endpoint` exposes the Temperature Measurement
    /// cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the measurement cannot be read or the store
    /// rejects the leaf.
    pub async fn probe(ctx: &AdapterContext, endpoint: &Endpoint) -> Result<Option<Self>> {
        let Some(client) = endpoint.cluster(temperature_measurement::ID) else {
            return Ok(None);
        };

        let current = client
            .read_attribute(temperature_measurement::MEASURED_VALUE)
            .await?;
        let base = AdapterBase::new(ctx, Self::NAME, endpoint.path());

        let key = base
            .ensure_leaf_state(
                VALUE_LEAF,
                &LeafSpec::number("Temperature", "value.temperature").with_unit("°C"),
                ClusterTag::attribute(
                    temperature_measurement::ID,
                    temperature_measurement::MEASURED_VALUE,
                ),
                Some(celsius(&current)),
            )
            .await?;

        base.register_attribute_listener(&client, temperature_measurement::MEASURED_VALUE);

        tracing::info!(path = %endpoint.path(), "TemperatureMeasurement adapter attached");

        Ok(Some(Self { base, key }))
    }
}

#[async_trait]
impl ClusterAdapter for TemperatureMeasurementAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn on_attribute_changed(
        &self,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<()> {
        if attribute != temperature_measurement::MEASURED_VALUE {
            return Ok(());
        }
        self.base.publish(&self.key, celsius(&value)).await
    }
}

/// Probe for [`TemperatureMeasurementAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemperatureMeasurementFactory;

#[async_trait]
impl AdapterFactory for TemperatureMeasurementFactory {
    fn name(&self) -> &'static str {
        TemperatureMeasurementAdapter::NAME
    }

    fn cluster_id(&self) -> ClusterId {
        temperature_measurement::ID
    }

    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>> {
        Ok(TemperatureMeasurementAdapter::probe(ctx, endpoint)
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
    use crate::types::EndpointPath;
    use tokio::sync::mpsc;

    #[test]
    fn celsius_scales_hundredths() {
        assert_eq!(celsius(&AttributeValue::from(2150i16)), StateValue::Number(21.5));
        assert_eq!(celsius(&AttributeValue::from(-250i16)), StateValue::Number(-2.5));
        assert_eq!(celsius(&AttributeValue::Null), StateValue::Null);
    }

    #[tokio::test]
    async fn leaf_has_unit() {
        let store = Arc::new(MemoryStore::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let ctx = AdapterContext::new(
            store.clone(),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(BridgeConfig::default()),
            tx,
        );
        let cluster = Arc::new(
            VirtualCluster::new(temperature_measurement::ID)
                .with_attribute(temperature_measurement::MEASURED_VALUE, 1875i16),
        );
        let endpoint = Endpoint::new(EndpointPath::root("n2"), "Temperature Sensor")
            .with_cluster(cluster);

        TemperatureMeasurementAdapter::probe(&ctx, &endpoint)
            .await
            .unwrap()
            .unwrap();

        let key = "matter.0.n2.temperature.value";
        assert_eq!(store.object(key).unwrap().common.unit.as_deref(), Some("°C"));
        assert_eq!(store.state(key).unwrap().value, StateValue::Number(18.75));
    }
}
