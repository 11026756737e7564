// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

pub mod connections;
pub mod lifecycle;
pub mod platform;
pub mod router;

pub use platform::Platform;
