// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot fleet for the floatd inspect service: per-credential session
//! actors and the controller that routes work across them.

pub mod bot;
pub mod controller;

pub use bot::{APP_ID, BotHandle, BotPolicy, BotResponse, BotState, spawn_bot};
pub use controller::BotController;
