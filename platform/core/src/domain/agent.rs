// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Descriptions of the agents hosted inside a deployed container and the
//! messages they exchange. An agent's description is reported by its
//! container and replaced wholesale on every registry refresh.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single running agent, including its capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDescription {
    /// Globally unique agent identifier.
    pub agent_id: String,

    /// Name/type of the agent, e.g. "VehicleAgent".
    pub agent_type: Option<String>,

    /// Optional human-readable description.
    pub description: Option<String>,

    /// Actions this agent can be invoked with.
    pub actions: Vec<ActionDescription>,

    /// Endpoints for sending or receiving streaming data.
    pub streams: Vec<StreamDescription>,
}

impl Default for AgentDescription {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            agent_type: None,
            description: None,
            actions: Vec::new(),
            streams: Vec::new(),
        }
    }
}

impl AgentDescription {
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name == name)
    }
}

/// A named, schema-typed operation an agent can be invoked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionDescription {
    pub name: String,

    /// Parameter name to type/schema.
    pub parameters: HashMap<String, serde_json::Value>,

    /// Type/schema of the result, if any.
    pub result: Option<serde_json::Value>,
}

impl Default for ActionDescription {
    fn default() -> Self {
        Self {
            name: String::new(),
            parameters: HashMap::new(),
            result: None,
        }
    }
}

/// Endpoint descriptor for streaming data into or out of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamDescription {
    pub name: String,

    /// Direction of the stream from the agent's point of view.
    pub mode: StreamMode,
}

impl Default for StreamDescription {
    fn default() -> Self {
        Self {
            name: String::new(),
            mode: StreamMode::Get,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamMode {
    Get,
    Post,
}

/// Payload of a `send` or `broadcast` call.
///
/// Unknown fields are rejected so that malformed bodies surface as an
/// invalid-payload error instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Message {
    pub payload: serde_json::Value,

    #[serde(default)]
    pub reply_to: Option<String>,
}
