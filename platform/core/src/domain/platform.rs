// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::domain::container::DeployedContainer;
use serde::{Deserialize, Serialize};

/// Platform self-description, served on `GET /info` and cached for each
/// connected peer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformInfo {
    /// Canonical base URL under which this platform is reachable.
    pub base_url: String,

    pub containers: Vec<DeployedContainer>,

    /// Base URLs of connected peer platforms.
    pub connections: Vec<String>,
}

/// A federated peer platform, established by mutual registration.
///
/// The cached info is best-effort and allowed to go stale until the next
/// notify; routing never depends on it being current.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnection {
    pub base_url: String,

    #[serde(default)]
    pub info: PlatformInfo,
}
