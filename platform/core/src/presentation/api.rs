// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::application::Platform;
use crate::domain::agent::{AgentDescription, Message};
use crate::domain::container::{ContainerStartRequest, DeployedContainer};
use crate::domain::error::PlatformError;
use crate::domain::events::Event;
use crate::domain::platform::PlatformInfo;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the platform's HTTP application. Paths are part of the container
/// and federation contract; containers and peers address these exact routes.
pub fn app(platform: Arc<Platform>) -> axum::Router {
    axum::Router::new()
        .route("/info", get(info))
        .route("/history", get(history))
        .route("/agents", get(agents))
        .route("/agents/{agent_id}", get(agent))
        .route("/send/{agent_id}", post(send))
        .route("/broadcast/{channel}", post(broadcast))
        .route("/invoke/{action}", post(invoke))
        .route("/invoke/{action}/{agent_id}", post(invoke_named))
        .route("/containers", post(add_container).get(containers))
        .route("/containers/notify", post(notify_container))
        .route(
            "/containers/{container_id}",
            get(container).delete(remove_container),
        )
        .route(
            "/connections",
            post(connect).get(connections).delete(disconnect),
        )
        .route("/connections/notify", post(notify_connection))
        .layer(TraceLayer::new_for_http())
        .with_state(platform)
}

/// Query parameters shared by the routing entry points.
#[derive(Debug, Deserialize)]
struct RouteQuery {
    #[serde(rename = "containerId")]
    container_id: Option<String>,
    forward: Option<bool>,
}

impl RouteQuery {
    fn forward(&self) -> bool {
        self.forward.unwrap_or(true)
    }
}

pub struct ApiError(PlatformError);

impl From<PlatformError> for ApiError {
    fn from(err: PlatformError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PlatformError::NotFound(_) => StatusCode::NOT_FOUND,
            PlatformError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlatformError::Unreachable(_) => StatusCode::BAD_GATEWAY,
            PlatformError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// info routes

async fn info(State(platform): State<Arc<Platform>>) -> Json<PlatformInfo> {
    Json(platform.info())
}

async fn history(State(platform): State<Arc<Platform>>) -> Json<Vec<Event>> {
    Json(platform.history())
}

// agent routes

async fn agents(State(platform): State<Arc<Platform>>) -> Json<Vec<AgentDescription>> {
    Json(platform.agents())
}

/// An unknown agent id yields an empty 200 result, not a 404.
async fn agent(
    State(platform): State<Arc<Platform>>,
    Path(agent_id): Path<String>,
) -> Json<Option<AgentDescription>> {
    Json(platform.agent(&agent_id))
}

async fn send(
    State(platform): State<Arc<Platform>>,
    Path(agent_id): Path<String>,
    Query(query): Query<RouteQuery>,
    Json(message): Json<Message>,
) -> Result<Json<serde_json::Value>, ApiError> {
    platform
        .send(
            &agent_id,
            &message,
            query.container_id.as_deref(),
            query.forward(),
        )
        .await?;
    Ok(Json(serde_json::Value::Null))
}

async fn broadcast(
    State(platform): State<Arc<Platform>>,
    Path(channel): Path<String>,
    Query(query): Query<RouteQuery>,
    Json(message): Json<Message>,
) -> Result<Json<serde_json::Value>, ApiError> {
    platform
        .broadcast(
            &channel,
            &message,
            query.container_id.as_deref(),
            query.forward(),
        )
        .await?;
    Ok(Json(serde_json::Value::Null))
}

async fn invoke(
    State(platform): State<Arc<Platform>>,
    Path(action): Path<String>,
    Query(query): Query<RouteQuery>,
    Json(params): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = platform
        .invoke(
            &action,
            &params,
            None,
            query.container_id.as_deref(),
            query.forward(),
        )
        .await?;
    Ok(Json(result))
}

async fn invoke_named(
    State(platform): State<Arc<Platform>>,
    Path((action, agent_id)): Path<(String, String)>,
    Query(query): Query<RouteQuery>,
    Json(params): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = platform
        .invoke(
            &action,
            &params,
            Some(&agent_id),
            query.container_id.as_deref(),
            query.forward(),
        )
        .await?;
    Ok(Json(result))
}

// container routes

async fn add_container(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<ContainerStartRequest>,
) -> Result<Json<String>, ApiError> {
    Ok(Json(platform.deploy_container(request).await?))
}

async fn containers(State(platform): State<Arc<Platform>>) -> Json<Vec<DeployedContainer>> {
    Json(platform.containers())
}

async fn container(
    State(platform): State<Arc<Platform>>,
    Path(container_id): Path<String>,
) -> Json<Option<DeployedContainer>> {
    Json(platform.container(&container_id))
}

async fn remove_container(
    State(platform): State<Arc<Platform>>,
    Path(container_id): Path<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(platform.remove_container(&container_id).await?))
}

async fn notify_container(
    State(platform): State<Arc<Platform>>,
    Json(container_id): Json<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(platform.notify_container_update(&container_id).await?))
}

// connection routes

async fn connect(
    State(platform): State<Arc<Platform>>,
    Json(url): Json<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(platform.connect_platform(&url).await?))
}

async fn connections(State(platform): State<Arc<Platform>>) -> Json<Vec<String>> {
    Json(platform.connections())
}

async fn disconnect(
    State(platform): State<Arc<Platform>>,
    Json(url): Json<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(platform.disconnect_platform(&url).await?))
}

async fn notify_connection(
    State(platform): State<Arc<Platform>>,
    Json(url): Json<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(platform.notify_platform_update(&url).await?))
}
