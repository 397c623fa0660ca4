// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device session task.
//!
//! Every device gets one task that owns its adapters. Endpoint changes
//! arrive as [`SessionCommand`]s, attribute changes and store writes as
//! [`SyncEvent`]s; both are processed one at a time, so the adapters of a
//! device never run concurrently with each other. A slow command on one
//! device never delays the events of another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapter::{
    AdapterContext, AdapterFactoryChain, AdapterId, ClusterAdapter, SyncEvent, ensure_container,
};
use crate::error::{Error, Result};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::Endpoint;
use crate::types::{DeviceId, EndpointPath};

/// Outcome of attaching adapters to a discovered endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachReport {
    /// The endpoint.
    pub path: EndpointPath,
    /// Names of the adapters that were attached.
    pub attached: Vec<&'static str>,
    /// Names of the adapters whose cluster the endpoint lacks.
    pub skipped: Vec<&'static str>,
    /// Adapters whose construction failed, with the error text.
    pub failed: Vec<(&'static str, String)>,
}

impl AttachReport {
    /// Returns `true` if every applicable adapter was attached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub(crate) enum SessionCommand {
    AddEndpoint {
        endpoint: Endpoint,
        reply: oneshot::Sender<Result<AttachReport>>,
    },
    RemoveEndpoint {
        path: EndpointPath,
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Cloneable sender side of a session.
#[derive(Debug, Clone)]
pub(crate) struct SessionClient {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionClient {
    pub(crate) async fn add_endpoint(&self, endpoint: Endpoint) -> Result<AttachReport> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::AddEndpoint { endpoint, reply })
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)?
    }

    pub(crate) async fn remove_endpoint(&self, path: EndpointPath) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::RemoveEndpoint { path, reply })
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)
    }
}

/// Owning handle of a running session.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    client: SessionClient,
    cancel: CancellationToken,
    task: JoinHandle<usize>,
}

impl SessionHandle {
    pub(crate) fn client(&self) -> SessionClient {
        self.client.clone()
    }

    /// Stops the session and returns the number of adapters torn down.
    ///
    /// The session first gets `timeout` to finish its current work and tear
    /// down; after that it is cancelled, which interrupts the work in
    /// progress but still tears down every adapter.
    pub(crate) async fn shutdown(self, device_id: &DeviceId, timeout: Duration) -> usize {
        let Self {
            client,
            cancel,
            mut task,
        } = self;

        // A closed queue means the task is already gone
        let _ = client.commands.send(SessionCommand::Shutdown);

        let joined = match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(%device_id, ?timeout, "Session did not stop in time, cancelling");
                cancel.cancel();
                task.await
            }
        };

        joined.unwrap_or_else(|e| {
            tracing::warn!(%device_id, error = %e, "Session task failed");
            0
        })
    }
}

/// The session task state.
pub(crate) struct DeviceSession {
    device_id: DeviceId,
    ctx: AdapterContext,
    chain: AdapterFactoryChain,
    event_bus: EventBus,
    adapters: HashMap<AdapterId, Arc<dyn ClusterAdapter>>,
    by_path: HashMap<EndpointPath, Vec<AdapterId>>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    cancel: CancellationToken,
}

impl DeviceSession {
    /// Spawns a session for `device_id` and returns its handle.
    ///
    /// `make_context` receives the sender of the session's event queue.
    pub(crate) fn spawn(
        device_id: DeviceId,
        make_context: impl FnOnce(mpsc::UnboundedSender<SyncEvent>) -> AdapterContext,
        chain: AdapterFactoryChain,
        event_bus: EventBus,
    ) -> SessionHandle {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let session = Self {
            device_id,
            ctx: make_context(event_tx),
            chain,
            event_bus,
            adapters: HashMap::new(),
            by_path: HashMap::new(),
            commands,
            events,
            cancel: cancel.clone(),
        };

        SessionHandle {
            client: SessionClient {
                commands: command_tx,
            },
            cancel,
            task: tokio::spawn(session.run()),
        }
    }

    async fn run(mut self) -> usize {
        tracing::debug!(device_id = %self.device_id, "Session started");
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if matches!(command, SessionCommand::Shutdown) {
                        break;
                    }
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = self.handle_command(command) => {}
                    }
                }
                Some(event) = self.events.recv() => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = self.dispatch(event) => {}
                    }
                }
            }
        }

        let removed = self.teardown_all();
        tracing::debug!(device_id = %self.device_id, adapters = removed, "Session stopped");
        removed
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::AddEndpoint { endpoint, reply } => {
                let result = self.add_endpoint(endpoint).await;
                // The caller may have given up waiting
                let _ = reply.send(result);
            }
            SessionCommand::RemoveEndpoint { path, reply } => {
                let _ = reply.send(self.remove_endpoint(&path));
            }
            SessionCommand::Shutdown => {}
        }
    }

    /// Creates the containers from the device down to `path`.
    async fn ensure_containers(&self, endpoint: &Endpoint) -> Result<()> {
        let store = self.ctx.store().as_ref();
        let namespace = &self.ctx.config().namespace;
        let path = endpoint.path();
        let segments = path.segments();

        for depth in 0..=segments.len() {
            let prefix = EndpointPath::new(self.device_id.clone(), segments[..depth].iter().copied())
                .namespace();
            let hint = if depth == segments.len() {
                endpoint.device_type().to_string()
            } else if depth == 0 {
                self.device_id.to_string()
            } else {
                format!("Endpoint {}", segments[depth - 1])
            };
            ensure_container(store, namespace, &self.device_id, &prefix, &hint).await?;
        }
        Ok(())
    }

    async fn add_endpoint(&mut self, endpoint: Endpoint) -> Result<AttachReport> {
        let path = endpoint.path().clone();

        // A re-discovered endpoint replaces the previous one
        let replaced = self.remove_endpoint(&path);
        if replaced > 0 {
            tracing::debug!(%path, replaced, "Replacing endpoint adapters");
        }

        if let Err(e) = self.ensure_containers(&endpoint).await {
            tracing::warn!(%path, error = %e, "Failed to create endpoint container");
            self.event_bus.publish(BridgeEvent::EndpointFailed {
                path,
                error: e.to_string(),
            });
            return Err(e);
        }

        let report = self.chain.run(&self.ctx, &endpoint).await;

        let mut attached = Vec::with_capacity(report.attached.len());
        let mut ids = Vec::with_capacity(report.attached.len());
        for adapter in report.attached {
            attached.push(adapter.name());
            ids.push(adapter.id());
            self.event_bus.publish(BridgeEvent::AdapterAttached {
                path: path.clone(),
                adapter: adapter.name(),
                keys: adapter.keys(),
            });
            self.adapters.insert(adapter.id(), adapter);
        }

        let failed: Vec<(&'static str, String)> = report
            .failed
            .into_iter()
            .map(|(name, e)| (name, e.to_string()))
            .collect();
        for (adapter, error) in &failed {
            self.event_bus.publish(BridgeEvent::AdapterFailed {
                path: path.clone(),
                adapter: *adapter,
                error: error.clone(),
            });
        }

        if !ids.is_empty() {
            self.by_path.insert(path.clone(), ids);
        }

        tracing::info!(%path, attached = ?attached, failed = failed.len(), "Endpoint attached");

        Ok(AttachReport {
            path,
            attached,
            skipped: report.skipped,
            failed,
        })
    }

    /// Tears down the adapters of one endpoint.
    fn remove_endpoint(&mut self, path: &EndpointPath) -> usize {
        let Some(ids) = self.by_path.remove(path) else {
            return 0;
        };

        let mut removed = 0;
        for id in ids {
            if let Some(adapter) = self.adapters.remove(&id) {
                adapter.teardown();
                removed += 1;
            }
        }
        removed
    }

    fn teardown_all(&mut self) -> usize {
        self.by_path.clear();
        let count = self.adapters.len();
        for (_, adapter) in self.adapters.drain() {
            adapter.teardown();
        }
        count
    }

    async fn dispatch(&self, event: SyncEvent) {
        let Some(adapter) = self.adapters.get(&event.adapter()).cloned() else {
            // Queued before its adapter was torn down
            tracing::debug!(
                device_id = %self.device_id,
                adapter = %event.adapter(),
                "Dropping event for removed adapter"
            );
            return;
        };

        let written_key = match &event {
            SyncEvent::StoreWrite { key, .. } => Some(key.clone()),
            SyncEvent::AttributeChanged { .. } => None,
        };

        let Err(e) = adapter.handle(event).await else {
            return;
        };

        match written_key {
            Some(key) => {
                tracing::warn!(
                    device_id = %self.device_id,
                    adapter = adapter.name(),
                    key = %key,
                    error = %e,
                    "Store write not carried out"
                );
                self.event_bus.publish(BridgeEvent::WriteFailed {
                    device_id: self.device_id.clone(),
                    key,
                    error: e.to_string(),
                });
            }
            None => {
                tracing::warn!(
                    device_id = %self.device_id,
                    adapter = adapter.name(),
                    error = %e,
                    "Failed to mirror attribute change"
                );
            }
        }
    }
}
