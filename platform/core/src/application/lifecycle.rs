// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Container lifecycle orchestration: deployment, teardown and capability
//! refresh, abstracted over the container backend.

use crate::domain::backend::ContainerBackend;
use crate::domain::config::PlatformConfig;
use crate::domain::container::{
    ContainerStartRequest, ContainerState, DeployedContainer, ENV_AUTH_TOKEN, ENV_CONTAINER_ID,
    ENV_PLATFORM_URL,
};
use crate::domain::error::{PlatformError, PlatformResult};
use crate::infrastructure::peers::PeerRegistry;
use crate::infrastructure::proxy::ApiProxy;
use crate::infrastructure::registry::ContainerRegistry;
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub struct ContainerManager {
    config: PlatformConfig,
    backend: Arc<dyn ContainerBackend>,
    registry: Arc<ContainerRegistry>,
    peers: Arc<PeerRegistry>,
    tokens: Arc<RwLock<HashMap<String, String>>>,
    client: Client,
}

impl ContainerManager {
    pub fn new(
        config: PlatformConfig,
        backend: Arc<dyn ContainerBackend>,
        registry: Arc<ContainerRegistry>,
        peers: Arc<PeerRegistry>,
        tokens: Arc<RwLock<HashMap<String, String>>>,
        client: Client,
    ) -> Self {
        Self {
            config,
            backend,
            registry,
            peers,
            tokens,
            client,
        }
    }

    /// Deploy a container: start it through the backend, wait for its API
    /// to come up, then register it with the agents it reports. A container
    /// that never serves its API within the deploy timeout is rolled back
    /// and surfaces as unreachable.
    pub async fn deploy(&self, request: ContainerStartRequest) -> PlatformResult<String> {
        let container_id = Uuid::new_v4().to_string();
        let env = self.build_env(&container_id, &request)?;

        let image_name = request.image.image_name.clone();
        let connectivity = self
            .backend
            .start_container(&container_id, &request.image, &env)
            .await
            .map_err(PlatformError::from)?;

        let api_url = connectivity.api_url();
        self.registry.register(DeployedContainer {
            container_id: container_id.clone(),
            image: request.image,
            connectivity,
            agents: Vec::new(),
            state: ContainerState::Starting,
        });

        let info = match self.await_container_api(&api_url).await {
            Ok(info) => info,
            Err(err) => {
                warn!(
                    container = %container_id,
                    image = %image_name,
                    "container API never came up, rolling back"
                );
                self.registry.remove(&container_id);
                if let Err(stop_err) = self.backend.stop_container(&container_id).await {
                    warn!(container = %container_id, "rollback stop failed: {stop_err}");
                }
                return Err(err);
            }
        };

        info!(
            container = %container_id,
            image = %image_name,
            agents = info.agents.len(),
            "deployed agent container"
        );

        self.registry.update_agents(&container_id, info.agents);
        self.registry
            .set_state(&container_id, ContainerState::Ready);
        if let Some(token) = request.auth_token {
            self.tokens.write().insert(container_id.clone(), token);
        }
        self.notify_peers();

        Ok(container_id)
    }

    /// Stop and remove a container. Removing an unknown identifier is a
    /// negative result, not an error.
    pub async fn remove(&self, container_id: &str) -> PlatformResult<bool> {
        if self.registry.remove(container_id).is_none() {
            return Ok(false);
        }
        if let Err(e) = self.backend.stop_container(container_id).await {
            warn!(container = container_id, "backend stop reported: {e}");
        }
        self.tokens.write().remove(container_id);
        self.notify_peers();
        Ok(true)
    }

    /// Re-fetch a container's own capability description and replace its
    /// agent list wholesale. Failure to reach the container leaves it stale.
    pub async fn notify_container_update(&self, container_id: &str) -> PlatformResult<bool> {
        let container = self
            .registry
            .get(container_id)
            .ok_or_else(|| PlatformError::NotFound(format!("container {container_id}")))?;

        let proxy = ApiProxy::new(&self.client, &container.api_url());
        match proxy.container_info().await {
            Ok(info) => {
                self.registry.update_agents(container_id, info.agents);
                self.registry.set_state(container_id, ContainerState::Ready);
                self.notify_peers();
                Ok(true)
            }
            Err(e) => {
                self.registry.set_state(container_id, ContainerState::Stale);
                Err(PlatformError::Unreachable(format!(
                    "container {container_id}: {e}"
                )))
            }
        }
    }

    /// Environment passed into a started container: its assigned identifier,
    /// the platform's callback address, and the image's declared parameters
    /// resolved against the request arguments.
    fn build_env(
        &self,
        container_id: &str,
        request: &ContainerStartRequest,
    ) -> PlatformResult<HashMap<String, String>> {
        let mut env = HashMap::new();
        env.insert(ENV_CONTAINER_ID.to_string(), container_id.to_string());
        env.insert(ENV_PLATFORM_URL.to_string(), self.config.own_base_url());
        if let Some(token) = &request.auth_token {
            env.insert(ENV_AUTH_TOKEN.to_string(), token.clone());
        }

        for parameter in &request.image.parameters {
            if let Some(value) = request.arguments.get(&parameter.name) {
                env.insert(parameter.name.clone(), value.clone());
            } else if let Some(default) = &parameter.default_value {
                env.insert(parameter.name.clone(), default.clone());
            } else if parameter.required {
                return Err(PlatformError::InvalidPayload(format!(
                    "missing required parameter {}",
                    parameter.name
                )));
            }
        }
        Ok(env)
    }

    /// Poll the container's `/info` route until it answers or the deploy
    /// timeout elapses.
    async fn await_container_api(
        &self,
        api_url: &str,
    ) -> PlatformResult<crate::domain::container::ContainerInfo> {
        let proxy = ApiProxy::new(&self.client, api_url);
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.deploy_timeout_secs);
        loop {
            match proxy.container_info().await {
                Ok(info) => return Ok(info),
                Err(e) if tokio::time::Instant::now() >= deadline => {
                    return Err(PlatformError::Unreachable(format!(
                        "container API at {api_url} did not come up: {e}"
                    )));
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(500)).await,
            }
        }
    }

    /// Tell every connected peer that this platform changed, off the
    /// caller's critical path.
    fn notify_peers(&self) {
        let peers = self.peers.urls();
        if peers.is_empty() {
            return;
        }
        let client = self.client.clone();
        let own_url = self.config.own_base_url();
        tokio::spawn(async move {
            for peer in peers {
                if let Err(e) = ApiProxy::new(&client, &peer)
                    .notify_platform_update(&own_url)
                    .await
                {
                    warn!(peer = %peer, "peer update notification failed: {e}");
                }
            }
        });
    }
}
