// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! The pluggable seam between the platform and the execution environment
//! that actually runs containers. One implementation per environment; the
//! platform routes through the trait uniformly and never special-cases a
//! backend outside its own module.

use crate::domain::container::{Connectivity, ContainerImageSpec};
use crate::domain::error::PlatformError;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The image reference could not be resolved.
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// Registry or auth error while pulling the image.
    #[error("image pull failed: {0}")]
    PullFailed(String),

    /// The container identifier is unknown or already stopped. This is a
    /// user-visible negative result, not a fatal error.
    #[error("container not found: {0}")]
    NotFound(String),

    /// The execution environment itself did not respond.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<BackendError> for PlatformError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ImageNotFound(msg) | BackendError::NotFound(msg) => {
                PlatformError::NotFound(msg)
            }
            BackendError::PullFailed(msg) | BackendError::Unavailable(msg) => {
                PlatformError::Unreachable(msg)
            }
        }
    }
}

/// Starts and stops container units in one execution environment.
///
/// The backend keeps only its own environment-specific handle per container
/// (native id, internal address, reserved ports), keyed by the same
/// container identifier the registry uses. It never owns the registry
/// record.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Pull the image if needed, allocate one host port per required port,
    /// and start the unit with the given environment. Reservations made
    /// before a failure are released; a failed start leaves nothing behind.
    async fn start_container(
        &self,
        container_id: &str,
        image: &ContainerImageSpec,
        env: &HashMap<String, String>,
    ) -> Result<Connectivity, BackendError>;

    /// Stop the unit and release its reserved ports.
    async fn stop_container(&self, container_id: &str) -> Result<(), BackendError>;

    /// Backend-internal reachable address, for backend-to-backend traffic.
    /// Only defined for containers that were started successfully.
    async fn internal_address(&self, container_id: &str) -> Result<String, BackendError>;

    /// Export the backend-specific handle table for session persistence.
    fn snapshot_handles(&self) -> HashMap<String, serde_json::Value>;

    /// Restore the handle table from a session snapshot.
    fn restore_handles(&self, handles: HashMap<String, serde_json::Value>);
}
