// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for the floatd inspect service: the axum router, the
//! API-key guard, CORS reflection, and the fixed-window rate limiter.

pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{BODY_LIMIT, GatewayConfig, GatewayState, build_router, serve};
