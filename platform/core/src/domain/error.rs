// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error taxonomy of the platform API.
///
/// Idempotent "already absent" outcomes (stopping an unknown container,
/// disconnecting a never-connected peer) are not errors; those operations
/// return `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Unknown agent, action, container or peer. Surfaces as 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed or incomplete request body. Surfaces as 422.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The target is known to exist but did not respond within the
    /// configured timeout. Surfaces as 502.
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;
