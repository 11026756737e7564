// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Platform configuration, loadable from a YAML file with CLI/env
//! overrides applied on top.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PlatformConfig {
    /// Address the HTTP API binds to.
    pub host: String,

    /// Port the HTTP API binds to.
    pub port: u16,

    /// Base URL under which this platform is reachable from containers and
    /// peers. Defaults to `http://localhost:{port}`.
    pub public_url: Option<String>,

    /// Which execution environment runs the containers.
    pub backend: BackendKind,

    /// Custom Docker socket path; auto-detected when unset.
    pub docker_socket: Option<String>,

    /// Pull images even when they are already present locally.
    pub always_pull: bool,

    /// How long to wait for a started container to serve its API before the
    /// deployment is rolled back.
    pub deploy_timeout_secs: u64,

    /// Timeout for any single outbound call to a container or peer.
    pub request_timeout_secs: u64,

    /// Per-registry pull credentials. A registry with no matching entry is
    /// attempted unauthenticated.
    pub registries: Vec<RegistryCredentials>,

    /// Where the session snapshot is stored between restarts. Persistence
    /// is disabled when unset.
    pub session_file: Option<PathBuf>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: None,
            backend: BackendKind::Docker,
            docker_socket: None,
            always_pull: false,
            deploy_timeout_secs: 30,
            request_timeout_secs: 10,
            registries: Vec::new(),
            session_file: None,
        }
    }
}

impl PlatformConfig {
    /// Canonical base URL of this platform, without a trailing slash.
    pub fn own_base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    /// The base URL stripped of its port, used as the public address of
    /// container port mappings.
    pub fn public_host(&self) -> String {
        let url = self.own_base_url();
        match url.rsplit_once(':') {
            Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) => head.to_string(),
            _ => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Docker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistryCredentials {
    /// Registry host as it appears in image references, e.g.
    /// "registry.example.org".
    pub registry: String,
    pub username: String,
    pub password: String,
}
