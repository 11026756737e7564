// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Agora Platform Daemon
//!
//! The `agora` binary runs one runtime platform: it connects to the
//! configured container backend, restores the previous session snapshot if
//! one exists, serves the platform HTTP API, and writes the session back on
//! shutdown.

use agora_core::application::Platform;
use agora_core::domain::backend::ContainerBackend;
use agora_core::domain::config::{BackendKind, PlatformConfig};
use agora_core::infrastructure::docker::DockerBackend;
use agora_core::infrastructure::ports::PortAllocator;
use agora_core::infrastructure::session::SessionSnapshot;
use agora_core::presentation::api;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Agora runtime platform - deploy agent containers, federate with peers
#[derive(Parser)]
#[command(name = "agora")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "AGORA_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address the HTTP API binds to
    #[arg(long, env = "AGORA_HOST")]
    host: Option<String>,

    /// Port the HTTP API binds to
    #[arg(long, env = "AGORA_PORT")]
    port: Option<u16>,

    /// Base URL under which containers and peers reach this platform
    #[arg(long, env = "AGORA_PUBLIC_URL")]
    public_url: Option<String>,

    /// Session snapshot file, restored on start and written on shutdown
    #[arg(long, env = "AGORA_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AGORA_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let config = load_config(&cli)?;

    let ports = Arc::new(PortAllocator::new());
    let backend: Arc<dyn ContainerBackend> = match config.backend {
        BackendKind::Docker => Arc::new(
            DockerBackend::initialize(&config, ports.clone())
                .await
                .context("container backend initialization failed")?,
        ),
    };

    let platform = Platform::new(config.clone(), backend, ports)?;

    if let Some(path) = &config.session_file {
        if let Some(snapshot) = SessionSnapshot::load(path)
            .with_context(|| format!("cannot read session file {}", path.display()))?
        {
            info!(
                containers = snapshot.containers.len(),
                connections = snapshot.connections.len(),
                "restored previous session"
            );
            platform.import_session(snapshot);
        }
    }

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("cannot bind {}:{}", config.host, config.port))?;
    info!(
        address = %listener.local_addr()?,
        base_url = %config.own_base_url(),
        "agora platform listening"
    );

    axum::serve(listener, api::app(platform.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &config.session_file {
        platform
            .export_session()
            .save(path)
            .with_context(|| format!("cannot write session file {}", path.display()))?;
        info!(path = %path.display(), "session snapshot written");
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PlatformConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config file {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => PlatformConfig::default(),
    };

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(public_url) = &cli.public_url {
        config.public_url = Some(public_url.clone());
    }
    if let Some(session_file) = &cli.session_file {
        config.session_file = Some(session_file.clone());
    }

    Ok(config)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
