// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Immutable records of API calls and their outcomes, consumed to build the
//! audit trail served on `/history`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "API_CALL")]
    ApiCall,
    #[serde(rename = "API_RESPONSE")]
    ApiResponse,
    #[serde(rename = "API_ERROR")]
    ApiError,
}

/// One append-only log record.
///
/// Terminal events (`API_RESPONSE`, `API_ERROR`) reference their originating
/// call through `related_id`. The log's total order is the order of append,
/// not the identifier value alone; events of concurrent calls may interleave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Monotonically assigned identifier.
    pub id: u64,

    pub event_type: EventType,

    /// Identifier of the originating `API_CALL`, for terminal events.
    #[serde(default)]
    pub related_id: Option<u64>,

    pub method_name: String,

    #[serde(default)]
    pub params: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}
