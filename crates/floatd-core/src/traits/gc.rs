// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The game-coordinator driver contract.
//!
//! The Steam session and GC wire codec live in an external library; this
//! trait pair is the seam the rest of the service programs against. A
//! factory creates one driver per login attempt and delivers session
//! events on the channel the caller supplies. Commands are fire-and-
//! forget at the wire level; outcomes arrive as events.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::FloatdError;
use crate::types::{LoginCredential, RawItemInfo};

/// Session events emitted by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum GcEvent {
    /// Credentials accepted; the session is logged on.
    LoggedOn,
    /// The session dropped. `eresult` carries the back-end result code
    /// when one was reported.
    Disconnected { eresult: i32, message: Option<String> },
    /// Session-level error outside the disconnect path.
    SessionError(String),
    /// The game-coordinator subchannel is up; inspects may be sent.
    ConnectedToGc,
    /// The game-coordinator subchannel dropped while the session stayed up.
    DisconnectedFromGc { reason: String },
    /// License state for the requested app is known.
    OwnershipCached { owns_app: bool },
    /// An inspect response. `iteminfo.itemid` echoes the requested asset
    /// id and is the correlation key.
    InspectItemInfo(RawItemInfo),
}

/// One authenticated session to the game back-end.
#[async_trait]
pub trait GcDriver: Send + Sync {
    /// Begins logging on. Success or failure is reported via events
    /// (`LoggedOn`, `Disconnected`, `SessionError`).
    async fn log_on(&self, credential: &LoginCredential) -> Result<(), FloatdError>;

    /// Gracefully ends the session. Best-effort.
    async fn log_off(&self);

    /// Announces the played app set, opening the GC subchannel for it.
    async fn games_played(&self, app_ids: &[u32]) -> Result<(), FloatdError>;

    /// Requests a free license for apps the account does not own.
    async fn request_free_license(&self, app_ids: &[u32]) -> Result<(), FloatdError>;

    /// Sends a per-item inspect query. The response arrives as an
    /// `InspectItemInfo` event with the echoed asset id.
    async fn inspect_item(&self, owner: &str, asset_id: &str, d: &str)
    -> Result<(), FloatdError>;
}

/// Creates drivers, one per login attempt.
pub trait GcDriverFactory: Send + Sync {
    /// Builds a fresh driver. `proxy_url` is the transport proxy assigned
    /// to this credential (`http://` or `socks5://`), when any. Events
    /// for the driver's lifetime are delivered on `events`.
    fn create(
        &self,
        proxy_url: Option<&str>,
        events: mpsc::Sender<GcEvent>,
    ) -> Result<Arc<dyn GcDriver>, FloatdError>;
}
