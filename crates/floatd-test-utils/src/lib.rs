// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test utilities for the floatd workspace.

pub mod mock_gc;

pub use mock_gc::{InspectBehavior, MockGcDriver, MockGcFactory, MockScript, raw_item};

use std::future::Future;
use std::time::Duration;

/// Polls `cond` until it returns true or `timeout` elapses.
pub async fn wait_for<F, Fut>(mut cond: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
