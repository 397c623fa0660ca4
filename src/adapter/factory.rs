// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter probes and the chain that runs them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AdapterContext, BooleanStateFactory, ClusterAdapter, IdentifyFactory, LevelControlFactory,
    OccupancySensingFactory, OnOffFactory, TemperatureMeasurementFactory,
};
use crate::error::{Error, Result};
use crate::protocol::{ClusterId, Endpoint};

/// Tries to build one adapter variant for an endpoint.
///
/// `Ok(None)` means the endpoint does not expose the cluster; it is the
/// normal outcome for most probes and not an error.
#[async_trait]
pub trait AdapterFactory: Send + Sync + fmt::Debug {
    /// Name of the adapter this factory builds.
    fn name(&self) -> &'static str;

    /// Cluster the adapter serves.
    fn cluster_id(&self) -> ClusterId;

    /// Builds the adapter if the endpoint exposes the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is present but construction failed.
    async fn probe(
        &self,
        ctx: &AdapterContext,
        endpoint: &Endpoint,
    ) -> Result<Option<Arc<dyn ClusterAdapter>>>;
}

/// Outcome of running a chain against one endpoint.
#[derive(Debug, Default)]
pub struct ProbeReport {
    /// Adapters that were built.
    pub attached: Vec<Arc<dyn ClusterAdapter>>,
    /// Factories whose cluster the endpoint does not expose.
    pub skipped: Vec<&'static str>,
    /// Factories whose construction failed, with the error.
    pub failed: Vec<(&'static str, Error)>,
}

impl ProbeReport {
    /// Returns the names of the attached adapters.
    #[must_use]
    pub fn attached_names(&self) -> Vec<&'static str> {
        self.attached.iter().map(|adapter| adapter.name()).collect()
    }
}

/// Ordered list of adapter probes.
///
/// Every probe runs for every endpoint; each applicable probe yields an
/// independent adapter. A failing probe is recorded and the rest still run.
///
/// # Examples
///
/// ```
/// use matter_state_sync::adapter::{AdapterFactoryChain, OnOffFactory};
///
/// let chain = AdapterFactoryChain::empty().with(OnOffFactory);
/// assert_eq!(chain.names(), vec!["OnOff"]);
/// assert_eq!(AdapterFactoryChain::standard().len(), 6);
/// ```
#[derive(Clone, Default)]
pub struct AdapterFactoryChain {
    factories: Vec<Arc<dyn AdapterFactory>>,
}

impl AdapterFactoryChain {
    /// Creates a chain with no probes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a chain with every built-in adapter.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with(IdentifyFactory)
            .with(OnOffFactory)
            .with(LevelControlFactory)
            .with(BooleanStateFactory)
            .with(OccupancySensingFactory)
            .with(TemperatureMeasurementFactory)
    }

    /// Appends a probe.
    #[must_use]
    pub fn with(mut self, factory: impl AdapterFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Returns the number of probes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if the chain has no probes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Returns the probe names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Runs every probe against `endpoint`.
    ///
    /// The endpoint's container must exist before this is called.
    pub async fn run(&self, ctx: &AdapterContext, endpoint: &Endpoint) -> ProbeReport {
        let mut report = ProbeReport::default();

        for factory in &self.factories {
            match factory.probe(ctx, endpoint).await {
                Ok(Some(adapter)) => report.attached.push(adapter),
                Ok(None) => report.skipped.push(factory.name()),
                Err(e) => {
                    tracing::warn!(
                        path = %endpoint.path(),
                        adapter = factory.name(),
                        error = %e,
                        "Adapter construction failed"
                    );
                    report.failed.push((factory.name(), e));
                }
            }
        }

        tracing::debug!(
            path = %endpoint.path(),
            attached = report.attached.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Probed endpoint"
        );
        report
    }
}

impl fmt::Debug for AdapterFactoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFactoryChain")
            .field("factories", &self.names())
            .finish()
    }
}
