// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Agora Runtime Platform Core
//!
//! Deploys agent containers on demand, tracks the agents and actions they
//! expose, and routes send/broadcast/invoke calls either to a locally hosted
//! container or to a federated peer platform.
//!
//! # Architecture
//!
//! - **domain** — data model, error taxonomy, the container backend trait
//! - **application** — container lifecycle, federated routing, peer connections
//! - **infrastructure** — Docker backend, registries, port allocator, event log
//! - **presentation** — the HTTP surface (Axum)

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
