// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Federated request routing.
//!
//! Every send/broadcast/invoke call is resolved against the local container
//! registry first; an unresolved call is re-issued to each connected peer
//! with forwarding disabled on the outgoing hop, so a call traverses at
//! most two platforms. Each call and its outcome are recorded in the event
//! log as a causally linked pair.

use crate::domain::agent::Message;
use crate::domain::container::DeployedContainer;
use crate::domain::error::{PlatformError, PlatformResult};
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::peers::PeerRegistry;
use crate::infrastructure::proxy::ApiProxy;
use crate::infrastructure::registry::ContainerRegistry;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Router {
    registry: Arc<ContainerRegistry>,
    peers: Arc<PeerRegistry>,
    events: Arc<EventLog>,
    client: Client,
}

impl Router {
    pub fn new(
        registry: Arc<ContainerRegistry>,
        peers: Arc<PeerRegistry>,
        events: Arc<EventLog>,
        client: Client,
    ) -> Self {
        Self {
            registry,
            peers,
            events,
            client,
        }
    }

    /// Deliver a message to one agent.
    pub async fn send(
        &self,
        agent_id: &str,
        message: &Message,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<()> {
        let call = self.events.api_call(
            "send",
            json!({ "agentId": agent_id, "message": message }),
        );
        let result = self
            .send_inner(agent_id, message, container_id, forward)
            .await;
        self.events.complete(call, "send", &result);
        result
    }

    /// Fan a message out to every container reachable on the channel. Zero
    /// recipients is not an error.
    pub async fn broadcast(
        &self,
        channel: &str,
        message: &Message,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<()> {
        let call = self.events.api_call(
            "broadcast",
            json!({ "channel": channel, "message": message }),
        );
        let result = self
            .broadcast_inner(channel, message, container_id, forward)
            .await;
        self.events.complete(call, "broadcast", &result);
        result
    }

    /// Invoke a named action, optionally on one specific agent, and return
    /// its result.
    pub async fn invoke(
        &self,
        action: &str,
        params: &serde_json::Map<String, serde_json::Value>,
        agent_id: Option<&str>,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<serde_json::Value> {
        let call = self.events.api_call(
            "invoke",
            json!({ "action": action, "agentId": agent_id, "params": params }),
        );
        let result = self
            .invoke_inner(action, params, agent_id, container_id, forward)
            .await;
        self.events.complete(call, "invoke", &result);
        result
    }

    async fn send_inner(
        &self,
        agent_id: &str,
        message: &Message,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<()> {
        if let Some(container) = self.resolve(container_id, |r| r.find_agent_container(agent_id))? {
            return self
                .container_proxy(&container)
                .send(agent_id, message, false)
                .await
                .map_err(|e| dispatch_error(&container, e));
        }

        if forward {
            for peer in self.peers.urls() {
                match ApiProxy::new(&self.client, &peer)
                    .send(agent_id, message, false)
                    .await
                {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        debug!(peer = %peer, agent = agent_id, "forward failed: {e}");
                    }
                }
            }
        }

        Err(PlatformError::NotFound(format!("agent {agent_id}")))
    }

    async fn broadcast_inner(
        &self,
        channel: &str,
        message: &Message,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<()> {
        let targets = match container_id {
            Some(id) => vec![self
                .registry
                .get(id)
                .ok_or_else(|| PlatformError::NotFound(format!("container {id}")))?],
            None => self.registry.list(),
        };

        for container in &targets {
            if let Err(e) = self
                .container_proxy(container)
                .broadcast(channel, message, false)
                .await
            {
                warn!(
                    container = %container.container_id,
                    channel,
                    "broadcast delivery failed: {e}"
                );
            }
        }

        // Broadcasts go out to every peer; a peer with no recipients
        // reports success with a no-op, so there is no first-success scan.
        if forward && container_id.is_none() {
            for peer in self.peers.urls() {
                if let Err(e) = ApiProxy::new(&self.client, &peer)
                    .broadcast(channel, message, false)
                    .await
                {
                    debug!(peer = %peer, channel, "broadcast forward failed: {e}");
                }
            }
        }

        Ok(())
    }

    async fn invoke_inner(
        &self,
        action: &str,
        params: &serde_json::Map<String, serde_json::Value>,
        agent_id: Option<&str>,
        container_id: Option<&str>,
        forward: bool,
    ) -> PlatformResult<serde_json::Value> {
        if let Some(container) =
            self.resolve(container_id, |r| r.find_action_container(action, agent_id))?
        {
            return self
                .container_proxy(&container)
                .invoke(action, agent_id, params, false)
                .await
                .map_err(|e| dispatch_error(&container, e));
        }

        if forward {
            for peer in self.peers.urls() {
                match ApiProxy::new(&self.client, &peer)
                    .invoke(action, agent_id, params, false)
                    .await
                {
                    Ok(result) => return Ok(result),
                    Err(e) => {
                        debug!(peer = %peer, action, "forward failed: {e}");
                    }
                }
            }
        }

        Err(PlatformError::NotFound(format!("action {action}")))
    }

    /// Resolve the target container: an explicit container id is looked up
    /// directly and must exist; otherwise the registry is scanned in
    /// registration order.
    fn resolve<F>(
        &self,
        container_id: Option<&str>,
        scan: F,
    ) -> PlatformResult<Option<DeployedContainer>>
    where
        F: FnOnce(&ContainerRegistry) -> Option<DeployedContainer>,
    {
        match container_id {
            Some(id) => self
                .registry
                .get(id)
                .ok_or_else(|| PlatformError::NotFound(format!("container {id}")))
                .map(Some),
            None => Ok(scan(&self.registry)),
        }
    }

    fn container_proxy(&self, container: &DeployedContainer) -> ApiProxy {
        ApiProxy::new(&self.client, &container.api_url())
    }
}

/// A locally resolved target was unambiguously known to exist, so a
/// dispatch failure is a gateway problem, not a lookup miss. The one
/// exception is the container's own "not found", which stays a lookup miss.
fn dispatch_error(
    container: &DeployedContainer,
    err: crate::infrastructure::proxy::ProxyError,
) -> PlatformError {
    if err.is_not_found() {
        return PlatformError::NotFound(format!(
            "container {} has no such target",
            container.container_id
        ));
    }
    PlatformError::Unreachable(format!(
        "container {}: {err}",
        container.container_id
    ))
}
