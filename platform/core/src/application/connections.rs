// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Mutual connection protocol between federated platforms.
//!
//! Connecting to a peer records the peer locally and makes the peer record
//! this platform back, so one initiating call establishes the connection on
//! both sides. The peer's symmetric callback is cut short by the pending
//! handshake mark, not by any wire-level flag.

use crate::domain::config::PlatformConfig;
use crate::domain::error::{PlatformError, PlatformResult};
use crate::domain::platform::PeerConnection;
use crate::infrastructure::peers::PeerRegistry;
use crate::infrastructure::proxy::ApiProxy;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ConnectionManager {
    config: PlatformConfig,
    peers: Arc<PeerRegistry>,
    client: Client,
}

impl ConnectionManager {
    pub fn new(config: PlatformConfig, peers: Arc<PeerRegistry>, client: Client) -> Self {
        Self {
            config,
            peers,
            client,
        }
    }

    /// Connect to the platform at `url`. Returns false when it was already
    /// connected; connecting twice is not an error.
    pub async fn connect(&self, url: &str) -> PlatformResult<bool> {
        let url = normalize_url(url);
        if self.peers.contains(&url) {
            return Ok(false);
        }
        if !self.peers.begin_handshake(&url) {
            // We initiated this handshake and the peer is now registering
            // us back; acknowledge without connecting a second time.
            return Ok(true);
        }

        let result = self.establish(&url).await;
        self.peers.end_handshake(&url);
        result
    }

    async fn establish(&self, url: &str) -> PlatformResult<bool> {
        let proxy = ApiProxy::new(&self.client, url);
        let peer_info = proxy
            .platform_info()
            .await
            .map_err(|e| PlatformError::Unreachable(format!("platform {url}: {e}")))?;
        let canonical = normalize_url(&peer_info.base_url);
        if self.peers.contains(&canonical) {
            return Ok(false);
        }

        proxy
            .connect_platform(&self.config.own_base_url())
            .await
            .map_err(|e| PlatformError::Unreachable(format!("platform {url}: {e}")))?;

        self.peers.insert(PeerConnection {
            base_url: canonical.clone(),
            info: peer_info,
        });
        info!(peer = %canonical, "connected platform");
        Ok(true)
    }

    /// Remove the peer locally and ask it to remove this platform. A peer
    /// that was never connected yields false; disconnecting is idempotent.
    pub async fn disconnect(&self, url: &str) -> PlatformResult<bool> {
        let url = normalize_url(url);
        if !self.peers.remove(&url) {
            return Ok(false);
        }

        let proxy = ApiProxy::new(&self.client, &url);
        if let Err(e) = proxy
            .disconnect_platform(&self.config.own_base_url())
            .await
        {
            warn!(peer = %url, "peer did not acknowledge disconnect: {e}");
        }
        info!(peer = %url, "disconnected platform");
        Ok(true)
    }

    /// Refresh the cached capability info of a connected peer. Unknown
    /// peers are a lookup miss, unreachable ones a gateway failure.
    pub async fn notify_platform_update(&self, url: &str) -> PlatformResult<bool> {
        let url = normalize_url(url);
        if !self.peers.contains(&url) {
            return Err(PlatformError::NotFound(format!("platform {url}")));
        }

        let proxy = ApiProxy::new(&self.client, &url);
        match proxy.platform_info().await {
            Ok(info) => {
                self.peers.update_info(&url, info);
                Ok(true)
            }
            Err(e) => Err(PlatformError::Unreachable(format!("platform {url}: {e}"))),
        }
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_normalized() {
        assert_eq!(normalize_url("http://a:8001/"), "http://a:8001");
        assert_eq!(normalize_url(" http://a:8001 "), "http://a:8001");
        assert_eq!(normalize_url("http://a:8001"), "http://a:8001");
    }
}
