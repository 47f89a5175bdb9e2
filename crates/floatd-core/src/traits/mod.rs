// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams for external collaborators.

pub mod gc;

pub use gc::{GcDriver, GcDriverFactory, GcEvent};
