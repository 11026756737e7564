// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! The process-scoped platform aggregate.
//!
//! One [`Platform`] owns all mutable state (registries, port allocator,
//! event log, issued tokens) and wires the router, lifecycle and connection
//! services to it. It is created on startup, passed by reference into the
//! presentation layer, and snapshotted into a [`SessionSnapshot`] on
//! shutdown.

use crate::application::connections::ConnectionManager;
use crate::application::lifecycle::ContainerManager;
use crate::application::router::Router;
use crate::domain::agent::{AgentDescription, Message};
use crate::domain::backend::ContainerBackend;
use crate::domain::config::PlatformConfig;
use crate::domain::container::{ContainerStartRequest, DeployedContainer};
use crate::domain::error::{PlatformError, PlatformResult};
use crate::domain::events::Event;
use crate::domain::platform::PlatformInfo;
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::peers::PeerRegistry;
use crate::infrastructure::ports::PortAllocator;
use crate::infrastructure::registry::ContainerRegistry;
use crate::infrastructure::session::SessionSnapshot;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct Platform {
    config: PlatformConfig,
    backend: Arc<dyn ContainerBackend>,
    registry: Arc<ContainerRegistry>,
    peers: Arc<PeerRegistry>,
    ports: Arc<PortAllocator>,
    events: Arc<EventLog>,
    tokens: Arc<RwLock<HashMap<String, String>>>,
    router: Router,
    containers: ContainerManager,
    connections: ConnectionManager,
}

impl Platform {
    pub fn new(
        config: PlatformConfig,
        backend: Arc<dyn ContainerBackend>,
        ports: Arc<PortAllocator>,
    ) -> PlatformResult<Arc<Self>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PlatformError::Internal(format!("HTTP client init failed: {e}")))?;

        let registry = Arc::new(ContainerRegistry::new());
        let peers = Arc::new(PeerRegistry::new());
        let events = Arc::new(EventLog::new());
        let tokens = Arc::new(RwLock::new(HashMap::new()));

        let router = Router::new(
            registry.clone(),
            peers.clone(),
            events.clone(),
            client.clone(),
        );
        let containers = ContainerManager::new(
            config.clone(),
            backend.clone(),
            registry.clone(),
            peers.clone(),
            tokens.clone(),
            client.clone(),
        );
        let connections = ConnectionManager::new(config.clone(), peers.clone(), client);

        Ok(Arc::new(Self {
            config,
            backend,
            registry,
            peers,
            ports,
            events,
            tokens,
            router,
            containers,
            connections,
        }))
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    // read-only surface

    pub fn info(&self) -> PlatformInfo {
        PlatformInfo {
            base_url: self.config.own_base_url(),
            containers: self.registry.list(),
            connections: self.peers.urls(),
        }
    }

    pub fn history(&self) -> Vec<Event> {
        self.events.history()
    }

    pub fn agents(&self) -> Vec<AgentDescription> {
        self.registry.agents()
    }

    pub fn agent(&self, agent_id: &str) -> Option<AgentDescription> {
        self.registry.agent(agent_id)
    }

    pub fn containers(&self) -> Vec<DeployedContainer> {
        self.registry.list()
    }

    pub fn container(&self, container_id: &str) -> Option<DeployedContainer> {
        self.registry.get(container_id)
    }

    pub fn connections(&self) -> Vec<String> {
        self.peers.urls()
    }

    // routing

    pub async fn send(
        &self,
        agent_id: &str,
        message: &Message,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<()> {
        self.router
            .send(agent_id, message, container_id, forward)
            .await
    }

    pub async fn broadcast(
        &self,
        channel: &str,
        message: &Message,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<()> {
        self.router
            .broadcast(channel, message, container_id, forward)
            .await
    }

    pub async fn invoke(
        &self,
        action: &str,
        params: &serde_json::Map<String, serde_json::Value>,
        agent_id: Option<&str>,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<serde_json::Value> {
        self.router
            .invoke(action, params, agent_id, container_id, forward)
            .await
    }

    // container lifecycle

    pub async fn deploy_container(&self, request: ContainerStartRequest) -> PlatformResult<String> {
        let params = json!({ "imageName": request.image.image_name });
        self.logged("addContainer", params, self.containers.deploy(request))
            .await
    }

    pub async fn remove_container(&self, container_id: &str) -> PlatformResult<bool> {
        let params = json!({ "containerId": container_id });
        self.logged("removeContainer", params, self.containers.remove(container_id))
            .await
    }

    pub async fn notify_container_update(&self, container_id: &str) -> PlatformResult<bool> {
        let params = json!({ "containerId": container_id });
        self.logged(
            "notifyUpdateContainer",
            params,
            self.containers.notify_container_update(container_id),
        )
        .await
    }

    // federation

    pub async fn connect_platform(&self, url: &str) -> PlatformResult<bool> {
        let params = json!({ "url": url });
        self.logged("connectPlatform", params, self.connections.connect(url))
            .await
    }

    pub async fn disconnect_platform(&self, url: &str) -> PlatformResult<bool> {
        let params = json!({ "url": url });
        self.logged(
            "disconnectPlatform",
            params,
            self.connections.disconnect(url),
        )
        .await
    }

    pub async fn notify_platform_update(&self, url: &str) -> PlatformResult<bool> {
        let params = json!({ "url": url });
        self.logged(
            "notifyUpdatePlatform",
            params,
            self.connections.notify_platform_update(url),
        )
        .await
    }

    // session persistence

    pub fn export_session(&self) -> SessionSnapshot {
        SessionSnapshot {
            tokens: self.tokens.read().clone(),
            containers: self.registry.list(),
            connections: self.peers.list(),
            backend_handles: self.backend.snapshot_handles(),
            used_ports: self.ports.snapshot(),
        }
    }

    pub fn import_session(&self, snapshot: SessionSnapshot) {
        *self.tokens.write() = snapshot.tokens;
        self.registry.restore(snapshot.containers);
        self.peers.restore(snapshot.connections);
        self.backend.restore_handles(snapshot.backend_handles);
        self.ports.restore(snapshot.used_ports);
    }

    /// Wrap an operation in its API_CALL / terminal event pair.
    async fn logged<T, F>(
        &self,
        method: &str,
        params: serde_json::Value,
        operation: F,
    ) -> PlatformResult<T>
    where
        F: Future<Output = PlatformResult<T>>,
    {
        let call = self.events.api_call(method, params);
        let result = operation.await;
        self.events.complete(call, method, &result);
        result
    }
}
