// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! One snapshot aggregating all mutable platform state, stored to and
//! loaded from file in between sessions.

use crate::domain::container::DeployedContainer;
use crate::domain::platform::PeerConnection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// The union of everything a platform restart must carry over.
///
/// Invariant: every running container's identifier has exactly one
/// corresponding backend handle; both are removed together on stop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    /// Issued auth tokens, keyed by container id.
    pub tokens: HashMap<String, String>,

    pub containers: Vec<DeployedContainer>,

    pub connections: Vec<PeerConnection>,

    /// Backend-specific handles, keyed by container id. Opaque to the
    /// platform; only the owning backend can interpret them.
    pub backend_handles: HashMap<String, serde_json::Value>,

    pub used_ports: BTreeSet<u16>,
}

impl SessionSnapshot {
    /// Load a snapshot, returning `None` when no session file exists yet.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
