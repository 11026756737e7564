// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed client for the HTTP contract shared by containers and peer
//! platforms. Used for dispatching routed calls to a container's API,
//! forwarding to a connected platform, and the mutual connection protocol.

use crate::domain::agent::Message;
use crate::domain::container::ContainerInfo;
use crate::domain::platform::PlatformInfo;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The remote answered with a non-success status.
    #[error("remote returned HTTP {0}")]
    Status(u16),

    /// Connection failure, timeout, or a malformed response body.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ProxyError {
    /// Whether the remote reported its own "not found" for the call.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProxyError::Status(404))
    }
}

/// Remote handle on one container or peer platform API at a base URL.
pub struct ApiProxy {
    base_url: String,
    client: Client,
}

impl ApiProxy {
    pub fn new(client: &Client, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: client.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // info routes

    pub async fn platform_info(&self) -> Result<PlatformInfo, ProxyError> {
        self.get("/info").await
    }

    pub async fn container_info(&self) -> Result<ContainerInfo, ProxyError> {
        self.get("/info").await
    }

    // agent routes

    /// The forward flag is always re-sent on the wire; an outgoing hop
    /// carries `forward=false`, which is the loop-prevention invariant.
    pub async fn send(
        &self,
        agent_id: &str,
        message: &Message,
        forward: bool,
    ) -> Result<(), ProxyError> {
        let path = format!("/send/{agent_id}?forward={forward}");
        self.post_unit(&path, message).await
    }

    pub async fn broadcast(
        &self,
        channel: &str,
        message: &Message,
        forward: bool,
    ) -> Result<(), ProxyError> {
        let path = format!("/broadcast/{channel}?forward={forward}");
        self.post_unit(&path, message).await
    }

    pub async fn invoke(
        &self,
        action: &str,
        agent_id: Option<&str>,
        params: &serde_json::Map<String, serde_json::Value>,
        forward: bool,
    ) -> Result<serde_json::Value, ProxyError> {
        let path = match agent_id {
            Some(agent) => format!("/invoke/{action}/{agent}?forward={forward}"),
            None => format!("/invoke/{action}?forward={forward}"),
        };
        self.post(&path, params).await
    }

    // connection routes

    pub async fn connect_platform(&self, url: &str) -> Result<bool, ProxyError> {
        self.post("/connections", &url).await
    }

    pub async fn disconnect_platform(&self, url: &str) -> Result<bool, ProxyError> {
        let response = self
            .client
            .delete(format!("{}/connections", self.base_url))
            .json(&url)
            .send()
            .await?;
        Self::checked(response).await?.json().await.map_err(Into::into)
    }

    pub async fn notify_platform_update(&self, url: &str) -> Result<bool, ProxyError> {
        self.post("/connections/notify", &url).await
    }

    // helpers

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProxyError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?;
        Self::checked(response).await?.json().await.map_err(Into::into)
    }

    async fn post<B: serde::Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProxyError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::checked(response).await?.json().await.map_err(Into::into)
    }

    async fn post_unit<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ProxyError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ProxyError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ProxyError::Status(response.status().as_u16()))
        }
    }
}
