// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Container-side data model: the requested deployment unit, the resolved
//! connectivity of a running container, and the registry record that owns
//! both.

use crate::domain::agent::AgentDescription;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default port on which a container serves the platform API contract.
pub const DEFAULT_API_PORT: u16 = 8082;

/// Environment variable carrying the container's assigned identifier.
pub const ENV_CONTAINER_ID: &str = "AGORA_CONTAINER_ID";
/// Environment variable carrying the platform's own callback base URL.
pub const ENV_PLATFORM_URL: &str = "AGORA_PLATFORM_URL";
/// Environment variable carrying the container's issued auth token, if any.
pub const ENV_AUTH_TOKEN: &str = "AGORA_AUTH_TOKEN";

/// Description of an agent container image to be started on the platform.
/// Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerImageSpec {
    /// Full image reference, including repository and version.
    pub image_name: String,

    /// Required features, e.g. available agents, actions or platform features.
    pub requires: Vec<String>,

    /// Special features provided by this container.
    pub provides: Vec<String>,

    /// Short readable name of this container.
    pub name: Option<String>,

    pub version: Option<String>,

    pub description: Option<String>,

    /// Provider of the container, e.g. institute or vendor.
    pub provider: Option<String>,

    /// Port where the container serves the platform API contract.
    pub api_port: u16,

    /// Additional container ports and the protocols served on them.
    pub extra_ports: HashMap<u16, PortDescription>,

    /// Parameters handed down to the container as environment variables.
    pub parameters: Vec<ImageParameter>,

    /// Custom type definitions (schema title to JSON schema).
    pub definitions: HashMap<String, serde_json::Value>,
}

impl Default for ContainerImageSpec {
    fn default() -> Self {
        Self {
            image_name: String::new(),
            requires: Vec::new(),
            provides: Vec::new(),
            name: None,
            version: None,
            description: None,
            provider: None,
            api_port: DEFAULT_API_PORT,
            extra_ports: HashMap::new(),
            parameters: Vec::new(),
            definitions: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortDescription {
    /// Protocol served via this port, e.g. "TCP" or "HTTP".
    pub protocol: String,

    pub description: Option<String>,
}

impl Default for PortDescription {
    fn default() -> Self {
        Self {
            protocol: "TCP".to_string(),
            description: None,
        }
    }
}

/// A deploy-time parameter, passed into the container's environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub required: bool,

    /// Confidential parameters must not be echoed back in container listings.
    pub confidential: bool,

    pub default_value: Option<String>,
}

impl Default for ImageParameter {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: "string".to_string(),
            required: false,
            confidential: false,
            default_value: None,
        }
    }
}

/// Resolved network reachability of a running container.
///
/// Created exactly once at deployment and never mutated afterward; a
/// container that needs new connectivity must be redeployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    /// Public base address of the host the container runs on.
    pub public_url: String,

    /// Externally mapped port of the container's API port.
    pub api_port_mapping: u16,

    /// Container-internal extra port to its externally mapped port.
    #[serde(default)]
    pub extra_port_mappings: HashMap<u16, u16>,
}

impl Connectivity {
    /// Base URL of the container's API as reachable from the platform.
    pub fn api_url(&self) -> String {
        format!("{}:{}", self.public_url, self.api_port_mapping)
    }
}

/// Lifecycle state of a deployed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerState {
    Starting,
    Ready,
    /// The last capability refresh failed; the cached agent list may be
    /// outdated until the next successful notify.
    Stale,
    Stopped,
}

/// A container deployed on this platform, owned by the container registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContainer {
    /// Generated identifier, unique per platform lifetime.
    pub container_id: String,

    /// The image spec this container was started from.
    pub image: ContainerImageSpec,

    pub connectivity: Connectivity,

    /// Agents currently reported by the container; replaced wholesale on
    /// every notify.
    pub agents: Vec<AgentDescription>,

    pub state: ContainerState,
}

impl DeployedContainer {
    pub fn api_url(&self) -> String {
        self.connectivity.api_url()
    }

    pub fn find_agent(&self, agent_id: &str) -> Option<&AgentDescription> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    /// Whether this container can serve `action`, optionally restricted to
    /// one specific agent.
    pub fn has_action(&self, action: &str, agent_id: Option<&str>) -> bool {
        self.agents
            .iter()
            .filter(|a| agent_id.is_none_or(|id| a.agent_id == id))
            .any(|a| a.has_action(action))
    }
}

/// What a container reports about itself on its `/info` route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerInfo {
    pub container_id: String,
    pub agents: Vec<AgentDescription>,
}

/// Request body for deploying a new container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStartRequest {
    pub image: ContainerImageSpec,

    /// Values for the image's declared parameters.
    #[serde(default)]
    pub arguments: HashMap<String, String>,

    /// Token the container may use to call back into the platform.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl From<ContainerImageSpec> for ContainerStartRequest {
    fn from(image: ContainerImageSpec) -> Self {
        Self {
            image,
            arguments: HashMap::new(),
            auth_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_spec_defaults_api_port() {
        let spec: ContainerImageSpec =
            serde_json::from_str(r#"{"imageName": "example/sample:v1"}"#).unwrap();
        assert_eq!(spec.image_name, "example/sample:v1");
        assert_eq!(spec.api_port, DEFAULT_API_PORT);
        assert!(spec.extra_ports.is_empty());
    }

    #[test]
    fn connectivity_api_url() {
        let conn = Connectivity {
            public_url: "http://localhost".to_string(),
            api_port_mapping: 8083,
            extra_port_mappings: HashMap::new(),
        };
        assert_eq!(conn.api_url(), "http://localhost:8083");
    }

    #[test]
    fn action_lookup_respects_agent_filter() {
        let container = DeployedContainer {
            container_id: "c1".to_string(),
            image: ContainerImageSpec::default(),
            connectivity: Connectivity {
                public_url: "http://localhost".to_string(),
                api_port_mapping: 8082,
                extra_port_mappings: HashMap::new(),
            },
            agents: vec![crate::domain::agent::AgentDescription {
                agent_id: "sample1".to_string(),
                actions: vec![crate::domain::agent::ActionDescription {
                    name: "Add".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            state: ContainerState::Ready,
        };
        assert!(container.has_action("Add", None));
        assert!(container.has_action("Add", Some("sample1")));
        assert!(!container.has_action("Add", Some("sample2")));
        assert!(!container.has_action("Sub", None));
    }
}
