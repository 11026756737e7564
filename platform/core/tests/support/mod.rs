// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Test support: an in-process container backend and a sample agent
//! container, so the full platform surface can be exercised end-to-end
//! without a container runtime.

use agora_core::application::Platform;
use agora_core::domain::agent::{ActionDescription, AgentDescription, Message};
use agora_core::domain::backend::{BackendError, ContainerBackend};
use agora_core::domain::config::PlatformConfig;
use agora_core::domain::container::{Connectivity, ContainerImageSpec, ContainerInfo};
use agora_core::infrastructure::ports::PortAllocator;
use agora_core::presentation::api;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const SAMPLE_IMAGE: &str = "registry.example.org/tests/sample-container:v5";
pub const BROKEN_IMAGE: &str = "hello-world";
pub const UNKNOWN_IMAGE: &str = "does-not-exist-container-image";

/// Image spec matching the sample container: API on 8082, one extra port.
pub fn sample_image() -> ContainerImageSpec {
    let mut spec = ContainerImageSpec {
        image_name: SAMPLE_IMAGE.to_string(),
        ..Default::default()
    };
    spec.extra_ports.insert(8888, Default::default());
    spec
}

fn sample_agents() -> Vec<AgentDescription> {
    vec![
        AgentDescription {
            agent_id: "sample1".to_string(),
            agent_type: Some("SampleAgent".to_string()),
            actions: vec![action("Add"), action("GetInfo")],
            ..Default::default()
        },
        AgentDescription {
            agent_id: "sample2".to_string(),
            agent_type: Some("SampleAgent".to_string()),
            actions: vec![action("GetInfo")],
            ..Default::default()
        },
    ]
}

fn action(name: &str) -> ActionDescription {
    ActionDescription {
        name: name.to_string(),
        ..Default::default()
    }
}

/// Mutable state of one running sample container.
pub struct SampleContainerState {
    pub container_id: String,
    pub env: HashMap<String, String>,
    pub agents: RwLock<Vec<AgentDescription>>,
    pub last_message: Mutex<Option<Message>>,
    pub last_broadcast: Mutex<Option<Message>>,
}

impl SampleContainerState {
    pub fn add_action(&self, agent_id: &str, name: &str) {
        let mut agents = self.agents.write();
        if let Some(agent) = agents.iter_mut().find(|a| a.agent_id == agent_id) {
            agent.actions.push(action(name));
        }
    }
}

fn sample_app(state: Arc<SampleContainerState>) -> axum::Router {
    axum::Router::new()
        .route("/info", get(container_info))
        .route("/send/{agent_id}", post(container_send))
        .route("/broadcast/{channel}", post(container_broadcast))
        .route("/invoke/{action}", post(container_invoke))
        .route("/invoke/{action}/{agent_id}", post(container_invoke_named))
        .with_state(state)
}

async fn container_info(State(state): State<Arc<SampleContainerState>>) -> Json<ContainerInfo> {
    Json(ContainerInfo {
        container_id: state.container_id.clone(),
        agents: state.agents.read().clone(),
    })
}

async fn container_send(
    State(state): State<Arc<SampleContainerState>>,
    Path(agent_id): Path<String>,
    Json(message): Json<Message>,
) -> Response {
    if !state.agents.read().iter().any(|a| a.agent_id == agent_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    *state.last_message.lock() = Some(message);
    Json(serde_json::Value::Null).into_response()
}

async fn container_broadcast(
    State(state): State<Arc<SampleContainerState>>,
    Path(_channel): Path<String>,
    Json(message): Json<Message>,
) -> Response {
    *state.last_broadcast.lock() = Some(message);
    Json(serde_json::Value::Null).into_response()
}

async fn container_invoke(
    State(state): State<Arc<SampleContainerState>>,
    Path(action): Path<String>,
    Json(params): Json<serde_json::Map<String, serde_json::Value>>,
) -> Response {
    run_action(&state, &action, None, &params)
}

async fn container_invoke_named(
    State(state): State<Arc<SampleContainerState>>,
    Path((action, agent_id)): Path<(String, String)>,
    Json(params): Json<serde_json::Map<String, serde_json::Value>>,
) -> Response {
    run_action(&state, &action, Some(&agent_id), &params)
}

fn run_action(
    state: &SampleContainerState,
    action: &str,
    agent_id: Option<&str>,
    params: &serde_json::Map<String, serde_json::Value>,
) -> Response {
    let agents = state.agents.read();
    let capable = agents
        .iter()
        .filter(|a| agent_id.is_none_or(|id| a.agent_id == id))
        .any(|a| a.actions.iter().any(|ac| ac.name == action));
    if !capable {
        return StatusCode::NOT_FOUND.into_response();
    }

    match action {
        "Add" => {
            let x = params.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
            let y = params.get("y").and_then(|v| v.as_i64()).unwrap_or(0);
            Json(json!(x + y)).into_response()
        }
        "GetInfo" => {
            let message = state.last_message.lock().clone();
            let broadcast = state.last_broadcast.lock().clone();
            Json(json!({
                "name": agent_id.unwrap_or("sample1"),
                "lastMessage": message.map(|m| m.payload),
                "lastBroadcast": broadcast.map(|m| m.payload),
            }))
            .into_response()
        }
        // dynamically added test actions have no behavior of their own
        _ => Json(serde_json::Value::Null).into_response(),
    }
}

struct StubHandle {
    server: Option<JoinHandle<()>>,
    state: Option<Arc<SampleContainerState>>,
    mapped_ports: Vec<u16>,
}

/// Container backend that runs sample containers as in-process HTTP
/// servers, reserving real host ports through the shared allocator.
pub struct StubBackend {
    ports: Arc<PortAllocator>,
    handles: Mutex<HashMap<String, StubHandle>>,
}

impl StubBackend {
    pub fn new(ports: Arc<PortAllocator>) -> Self {
        Self {
            ports,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, container_id: &str) -> Arc<SampleContainerState> {
        self.handles
            .lock()
            .get(container_id)
            .and_then(|h| h.state.clone())
            .expect("no sample container state for id")
    }

    /// Kill the container's server without stopping the container, leaving
    /// a registered-but-unreachable target.
    pub fn kill_server(&self, container_id: &str) {
        if let Some(handle) = self.handles.lock().get_mut(container_id) {
            if let Some(server) = handle.server.take() {
                server.abort();
            }
        }
    }

    /// Reserve a port the sample server can actually bind, keeping ports
    /// that turn out to be occupied on the host marked as used.
    async fn bind_reserved(
        &self,
        preferred: u16,
    ) -> Result<(u16, tokio::net::TcpListener), BackendError> {
        for _ in 0..32 {
            let port = self.ports.reserve(preferred);
            match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => return Ok((port, listener)),
                Err(_) => continue,
            }
        }
        Err(BackendError::Unavailable(
            "no bindable host port found".to_string(),
        ))
    }
}

#[async_trait]
impl ContainerBackend for StubBackend {
    async fn start_container(
        &self,
        container_id: &str,
        image: &ContainerImageSpec,
        env: &HashMap<String, String>,
    ) -> Result<Connectivity, BackendError> {
        if image.image_name.contains(UNKNOWN_IMAGE) {
            return Err(BackendError::ImageNotFound(image.image_name.clone()));
        }

        let broken = image.image_name == BROKEN_IMAGE;
        let (api_port, listener) = if broken {
            // reserve a port nothing will ever answer on
            (self.ports.reserve(image.api_port), None)
        } else {
            let (port, listener) = self.bind_reserved(image.api_port).await?;
            (port, Some(listener))
        };

        let mut reserved = vec![api_port];
        let mut extra_mappings = HashMap::new();
        for &container_port in image.extra_ports.keys() {
            let host_port = self.ports.reserve(container_port);
            extra_mappings.insert(container_port, host_port);
            reserved.push(host_port);
        }

        let (server, state) = match listener {
            Some(listener) => {
                let state = Arc::new(SampleContainerState {
                    container_id: container_id.to_string(),
                    env: env.clone(),
                    agents: RwLock::new(sample_agents()),
                    last_message: Mutex::new(None),
                    last_broadcast: Mutex::new(None),
                });
                let app = sample_app(state.clone());
                let server = tokio::spawn(async move {
                    let _ = axum::serve(listener, app).await;
                });
                (Some(server), Some(state))
            }
            None => (None, None),
        };

        self.handles.lock().insert(
            container_id.to_string(),
            StubHandle {
                server,
                state,
                mapped_ports: reserved,
            },
        );

        Ok(Connectivity {
            public_url: "http://127.0.0.1".to_string(),
            api_port_mapping: api_port,
            extra_port_mappings: extra_mappings,
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), BackendError> {
        let handle = self
            .handles
            .lock()
            .remove(container_id)
            .ok_or_else(|| BackendError::NotFound(container_id.to_string()))?;
        if let Some(server) = handle.server {
            server.abort();
        }
        self.ports.release(handle.mapped_ports);
        Ok(())
    }

    async fn internal_address(&self, container_id: &str) -> Result<String, BackendError> {
        self.handles
            .lock()
            .get(container_id)
            .map(|_| "127.0.0.1".to_string())
            .ok_or_else(|| BackendError::NotFound(container_id.to_string()))
    }

    fn snapshot_handles(&self) -> HashMap<String, serde_json::Value> {
        self.handles
            .lock()
            .iter()
            .map(|(id, handle)| (id.clone(), json!({ "mappedPorts": handle.mapped_ports })))
            .collect()
    }

    fn restore_handles(&self, _handles: HashMap<String, serde_json::Value>) {}
}

/// One platform under test: an HTTP server on an ephemeral port backed by a
/// stub container backend.
pub struct TestPlatform {
    pub platform: Arc<Platform>,
    pub backend: Arc<StubBackend>,
    pub base_url: String,
    pub client: reqwest::Client,
    _server: JoinHandle<()>,
}

pub async fn spawn_platform() -> TestPlatform {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = PlatformConfig {
        host: "127.0.0.1".to_string(),
        port,
        public_url: Some(format!("http://127.0.0.1:{port}")),
        deploy_timeout_secs: 2,
        request_timeout_secs: 2,
        ..Default::default()
    };

    let ports = Arc::new(PortAllocator::new());
    let backend = Arc::new(StubBackend::new(ports.clone()));
    let platform = Platform::new(config, backend.clone(), ports).unwrap();

    let app = api::app(platform.clone());
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestPlatform {
        platform,
        backend,
        base_url: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        _server: server,
    }
}

impl TestPlatform {
    /// Deploy the sample image and return the new container id.
    pub async fn deploy_sample(&self) -> String {
        let response = self
            .client
            .post(format!("{}/containers", self.base_url))
            .json(&json!({ "image": sample_image() }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .delete(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .unwrap()
    }
}

pub fn message(payload: &str) -> serde_json::Value {
    json!({ "payload": payload, "replyTo": "doesnotmatter" })
}
