// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface that translates external requests into platform calls.
//! No business logic lives here; all real work is delegated to the
//! application services.

pub mod api;
