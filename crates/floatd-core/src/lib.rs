// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the floatd inspect service.
//!
//! Provides the shared error type with its stable envelope table, the
//! inspect-link value type, item payload types, and the game-coordinator
//! driver contract every backend implements.

pub mod error;
pub mod link;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorEnvelope, FloatdError};
pub use link::InspectLink;
pub use traits::{GcDriver, GcDriverFactory, GcEvent};
pub use types::{DecoratedItem, LoginCredential, RankInfo, RawItemInfo};
