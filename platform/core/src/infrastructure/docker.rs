// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Container backend running agent containers on a Docker daemon.

use crate::domain::backend::{BackendError, ContainerBackend};
use crate::domain::config::PlatformConfig;
use crate::domain::container::{Connectivity, ContainerImageSpec};
use crate::infrastructure::ports::PortAllocator;
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use futures::StreamExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Docker-specific bookkeeping for one running container, keyed by the same
/// container identifier the registry uses. A non-owning cross-reference:
/// the registry record never embeds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerHandle {
    /// Native Docker container id.
    pub docker_id: String,

    /// Address on the Docker bridge network, for backend-internal traffic.
    pub internal_ip: Option<String>,

    /// Host ports reserved for this container, released on stop.
    pub mapped_ports: Vec<u16>,
}

pub struct DockerBackend {
    docker: Docker,
    ports: Arc<PortAllocator>,
    auth: HashMap<String, DockerCredentials>,
    public_host: String,
    always_pull: bool,
    handles: RwLock<HashMap<String, DockerHandle>>,
}

impl DockerBackend {
    /// Connect to the Docker daemon and verify it responds. Failure here is
    /// fatal to platform startup.
    pub async fn initialize(
        config: &PlatformConfig,
        ports: Arc<PortAllocator>,
    ) -> Result<Self, BackendError> {
        let docker = match &config.docker_socket {
            Some(path) => Docker::connect_with_unix(path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    BackendError::Unavailable(format!("cannot connect to Docker at {path}: {e}"))
                })?,
            None => Docker::connect_with_local_defaults().map_err(|e| {
                BackendError::Unavailable(format!("cannot connect to Docker: {e}"))
            })?,
        };
        docker
            .ping()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Docker daemon not responding: {e}")))?;

        let auth = config
            .registries
            .iter()
            .map(|cred| {
                (
                    cred.registry.clone(),
                    DockerCredentials {
                        username: Some(cred.username.clone()),
                        password: Some(cred.password.clone()),
                        serveraddress: Some(cred.registry.clone()),
                        ..Default::default()
                    },
                )
            })
            .collect();

        Ok(Self {
            docker,
            ports,
            auth,
            public_host: config.public_host(),
            always_pull: config.always_pull,
            handles: RwLock::new(HashMap::new()),
        })
    }

    /// Credentials for the registry segment of an image reference; an image
    /// from a registry with no configured entry is pulled unauthenticated.
    fn registry_auth(&self, image_name: &str) -> Option<DockerCredentials> {
        let registry = image_name.split('/').next()?;
        self.auth.get(registry).cloned()
    }

    async fn image_present(&self, image_name: &str) -> bool {
        self.docker.inspect_image(image_name).await.is_ok()
    }

    async fn pull_image(&self, image_name: &str) -> Result<(), BackendError> {
        info!(image = image_name, "pulling image");
        let options = Some(CreateImageOptions {
            from_image: image_name.to_string(),
            ..Default::default()
        });

        let mut stream = self
            .docker
            .create_image(options, None, self.registry_auth(image_name));
        while let Some(result) = stream.next().await {
            match result {
                Ok(_) => {}
                Err(DockerError::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    return Err(BackendError::ImageNotFound(image_name.to_string()));
                }
                Err(e) => {
                    return Err(BackendError::PullFailed(format!("{image_name}: {e}")));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn start_container(
        &self,
        container_id: &str,
        image: &ContainerImageSpec,
        env: &HashMap<String, String>,
    ) -> Result<Connectivity, BackendError> {
        if self.always_pull || !self.image_present(&image.image_name).await {
            self.pull_image(&image.image_name).await?;
        }

        // One host port per required container port, starting the scan at
        // the container's own port number.
        let api_host_port = self.ports.reserve(image.api_port);
        let mut reserved = vec![api_host_port];
        let mut extra_mappings = HashMap::new();
        for &container_port in image.extra_ports.keys() {
            let host_port = self.ports.reserve(container_port);
            extra_mappings.insert(container_port, host_port);
            reserved.push(host_port);
        }

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        for (&container_port, &host_port) in
            std::iter::once((&image.api_port, &api_host_port)).chain(extra_mappings.iter())
        {
            let key = format!("{container_port}/tcp");
            port_bindings.insert(
                key.clone(),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port.to_string()),
                }]),
            );
            exposed_ports.insert(key, HashMap::new());
        }

        let env_vars: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let options = CreateContainerOptions {
            name: format!("agora-{container_id}"),
            platform: None,
        };
        let container_config = Config {
            image: Some(image.image_name.clone()),
            env: Some(env_vars),
            exposed_ports: Some(exposed_ports),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = match self
            .docker
            .create_container(Some(options), container_config)
            .await
        {
            Ok(created) => created,
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                self.ports.release(reserved);
                return Err(BackendError::ImageNotFound(image.image_name.clone()));
            }
            Err(e) => {
                self.ports.release(reserved);
                return Err(BackendError::Unavailable(e.to_string()));
            }
        };

        if let Err(e) = self
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            let _ = self
                .docker
                .remove_container(
                    &created.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            self.ports.release(reserved);
            return Err(BackendError::Unavailable(format!(
                "failed to start container: {e}"
            )));
        }

        let internal_ip = self
            .docker
            .inspect_container(&created.id, None)
            .await
            .ok()
            .and_then(|info| info.network_settings)
            .and_then(|settings| settings.ip_address);

        info!(
            container = container_id,
            docker_id = %created.id,
            api_port = api_host_port,
            "started agent container"
        );

        self.handles.write().insert(
            container_id.to_string(),
            DockerHandle {
                docker_id: created.id,
                internal_ip,
                mapped_ports: reserved,
            },
        );

        Ok(Connectivity {
            public_url: self.public_host.clone(),
            api_port_mapping: api_host_port,
            extra_port_mappings: extra_mappings,
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), BackendError> {
        let handle = self
            .handles
            .write()
            .remove(container_id)
            .ok_or_else(|| BackendError::NotFound(container_id.to_string()))?;

        let result = self
            .docker
            .stop_container(&handle.docker_id, None::<StopContainerOptions>)
            .await;
        // Ports are freed even when the unit was already gone; the pairing
        // of registry record and handle has been dropped above.
        self.ports.release(handle.mapped_ports.iter().copied());

        match result {
            Ok(()) => {
                let _ = self
                    .docker
                    .remove_container(
                        &handle.docker_id,
                        Some(RemoveContainerOptions {
                            force: true,
                            ..Default::default()
                        }),
                    )
                    .await;
                info!(container = container_id, "stopped agent container");
                Ok(())
            }
            Err(DockerError::DockerResponseServerError {
                status_code: 304 | 404,
                ..
            }) => {
                warn!(
                    container = container_id,
                    "container already stopped or gone"
                );
                Err(BackendError::NotFound(container_id.to_string()))
            }
            Err(e) => Err(BackendError::Unavailable(e.to_string())),
        }
    }

    async fn internal_address(&self, container_id: &str) -> Result<String, BackendError> {
        self.handles
            .read()
            .get(container_id)
            .and_then(|handle| handle.internal_ip.clone())
            .ok_or_else(|| BackendError::NotFound(container_id.to_string()))
    }

    fn snapshot_handles(&self) -> HashMap<String, serde_json::Value> {
        self.handles
            .read()
            .iter()
            .filter_map(|(id, handle)| {
                serde_json::to_value(handle).ok().map(|v| (id.clone(), v))
            })
            .collect()
    }

    fn restore_handles(&self, handles: HashMap<String, serde_json::Value>) {
        let mut table = self.handles.write();
        for (id, value) in handles {
            match serde_json::from_value::<DockerHandle>(value) {
                Ok(handle) => {
                    table.insert(id, handle);
                }
                Err(e) => warn!(container = %id, "discarding unreadable backend handle: {e}"),
            }
        }
    }
}