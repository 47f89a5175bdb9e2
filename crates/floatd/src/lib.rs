// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! floatd - a network service resolving Counter-Strike inspect links
//! into fully decorated item records through a fleet of persistent
//! game-coordinator sessions.
//!
//! The binary wires the default (detached) game-coordinator backend;
//! embedders call [`serve::run`] with their own
//! [`floatd_core::GcDriverFactory`] implementation.

pub mod gc;
pub mod serve;
