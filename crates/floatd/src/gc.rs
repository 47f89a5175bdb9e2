// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game-coordinator backend registration.
//!
//! The Steam session and GC wire codec are provided by an external
//! driver library implementing [`GcDriverFactory`]; embedders pass their
//! factory to [`crate::serve::run`]. The default binary registers
//! [`DetachedFactory`], whose sessions never come up: the fleet stays
//! offline and the HTTP surface degrades to `SteamOffline` on cache
//! misses while `/stats` and `/health` keep serving.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use floatd_core::error::FloatdError;
use floatd_core::traits::gc::{GcDriver, GcDriverFactory, GcEvent};
use floatd_core::types::LoginCredential;

/// Factory for builds without a linked wire codec.
pub struct DetachedFactory;

impl GcDriverFactory for DetachedFactory {
    fn create(
        &self,
        _proxy_url: Option<&str>,
        events: mpsc::Sender<GcEvent>,
    ) -> Result<Arc<dyn GcDriver>, FloatdError> {
        Ok(Arc::new(DetachedDriver { _events: events }))
    }
}

struct DetachedDriver {
    _events: mpsc::Sender<GcEvent>,
}

#[async_trait]
impl GcDriver for DetachedDriver {
    async fn log_on(&self, _credential: &LoginCredential) -> Result<(), FloatdError> {
        Err(FloatdError::Session(
            "no game-coordinator driver linked into this build".to_string(),
        ))
    }

    async fn log_off(&self) {}

    async fn games_played(&self, _app_ids: &[u32]) -> Result<(), FloatdError> {
        Ok(())
    }

    async fn request_free_license(&self, _app_ids: &[u32]) -> Result<(), FloatdError> {
        Ok(())
    }

    async fn inspect_item(
        &self,
        _owner: &str,
        _asset_id: &str,
        _d: &str,
    ) -> Result<(), FloatdError> {
        Err(FloatdError::NotReady)
    }
}
