// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock game-coordinator driver for deterministic testing.
//!
//! `MockGcFactory` implements `GcDriverFactory` with scripted session
//! behavior, enabling fast, CI-runnable tests without a real back-end.
//! Each `create()` consumes the next script from a FIFO (falling back to
//! the default script), so multi-login tests can vary behavior per
//! attempt.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use floatd_core::error::FloatdError;
use floatd_core::traits::gc::{GcDriver, GcDriverFactory, GcEvent};
use floatd_core::types::{LoginCredential, RawItemInfo};
use tokio::sync::mpsc;

/// How a scripted driver answers `inspect_item`.
#[derive(Debug, Clone)]
pub enum InspectBehavior {
    /// Reply with a well-formed payload echoing the asset id.
    Echo {
        paintwear: f64,
        paintseed: Option<u32>,
        delay: Duration,
    },
    /// First emit a payload with the wrong item id, then the right one.
    WrongThenRight { wrong_itemid: String },
    /// Never reply; the caller's deadline must fire.
    Never,
}

impl Default for InspectBehavior {
    fn default() -> Self {
        InspectBehavior::Echo {
            paintwear: 0.25,
            paintseed: Some(42),
            delay: Duration::from_millis(0),
        }
    }
}

/// Scripted behavior for one driver lifetime.
#[derive(Debug, Clone)]
pub struct MockScript {
    /// `log_on` returns an error instead of starting the session.
    pub fail_log_on: bool,
    /// Emit `LoggedOn` + `OwnershipCached` when `log_on` is called.
    pub auto_logon: bool,
    /// Report the app as unowned, forcing a free-license request.
    pub owns_app: bool,
    /// Emit `ConnectedToGc` when `games_played` is called.
    pub auto_gc: bool,
    pub inspect: InspectBehavior,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            fail_log_on: false,
            auto_logon: true,
            owns_app: true,
            auto_gc: true,
            inspect: InspectBehavior::default(),
        }
    }
}

/// A well-formed raw payload for an asset id, as the scripted driver
/// would echo it.
pub fn raw_item(asset_id: &str, paintwear: f64, paintseed: Option<u32>) -> RawItemInfo {
    RawItemInfo {
        itemid: asset_id.to_string(),
        defindex: 7,
        paintindex: 282,
        rarity: 6,
        quality: 4,
        paintwear,
        paintseed,
        origin: Some(8),
        customname: None,
        killeatervalue: None,
        stickers: vec![],
        keychains: vec![],
    }
}

/// One scripted driver. Records calls and lets tests emit arbitrary
/// events mid-session.
pub struct MockGcDriver {
    script: MockScript,
    events: mpsc::Sender<GcEvent>,
    log_on_calls: AtomicUsize,
    log_off_calls: AtomicUsize,
    inspect_calls: AtomicUsize,
    free_license_calls: AtomicUsize,
}

impl MockGcDriver {
    /// Pushes an event to the owning bot, ignoring a closed channel.
    pub async fn emit(&self, event: GcEvent) {
        let _ = self.events.send(event).await;
    }

    pub fn log_on_calls(&self) -> usize {
        self.log_on_calls.load(Ordering::SeqCst)
    }

    pub fn log_off_calls(&self) -> usize {
        self.log_off_calls.load(Ordering::SeqCst)
    }

    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    pub fn free_license_calls(&self) -> usize {
        self.free_license_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GcDriver for MockGcDriver {
    async fn log_on(&self, _credential: &LoginCredential) -> Result<(), FloatdError> {
        self.log_on_calls.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_log_on {
            return Err(FloatdError::Session("scripted logon failure".to_string()));
        }
        if self.script.auto_logon {
            self.emit(GcEvent::LoggedOn).await;
            self.emit(GcEvent::OwnershipCached {
                owns_app: self.script.owns_app,
            })
            .await;
        }
        Ok(())
    }

    async fn log_off(&self) {
        self.log_off_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn games_played(&self, _app_ids: &[u32]) -> Result<(), FloatdError> {
        if self.script.auto_gc {
            self.emit(GcEvent::ConnectedToGc).await;
        }
        Ok(())
    }

    async fn request_free_license(&self, _app_ids: &[u32]) -> Result<(), FloatdError> {
        self.free_license_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn inspect_item(
        &self,
        _owner: &str,
        asset_id: &str,
        _d: &str,
    ) -> Result<(), FloatdError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        let events = self.events.clone();
        let asset_id = asset_id.to_string();
        match self.script.inspect.clone() {
            InspectBehavior::Echo {
                paintwear,
                paintseed,
                delay,
            } => {
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let _ = events
                        .send(GcEvent::InspectItemInfo(raw_item(
                            &asset_id, paintwear, paintseed,
                        )))
                        .await;
                });
            }
            InspectBehavior::WrongThenRight { wrong_itemid } => {
                tokio::spawn(async move {
                    let _ = events
                        .send(GcEvent::InspectItemInfo(raw_item(&wrong_itemid, 0.9, None)))
                        .await;
                    let _ = events
                        .send(GcEvent::InspectItemInfo(raw_item(&asset_id, 0.25, Some(42))))
                        .await;
                });
            }
            InspectBehavior::Never => {}
        }
        Ok(())
    }
}

/// Factory handing out scripted drivers, default script when the FIFO
/// runs dry.
pub struct MockGcFactory {
    scripts: Mutex<VecDeque<MockScript>>,
    created: Mutex<Vec<Arc<MockGcDriver>>>,
}

impl MockGcFactory {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scripts(scripts: Vec<MockScript>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::from(scripts)),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Queue a script for the next `create()`.
    pub fn push_script(&self, script: MockScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Drivers created so far, in creation order.
    pub fn created(&self) -> Vec<Arc<MockGcDriver>> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl Default for MockGcFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GcDriverFactory for MockGcFactory {
    fn create(
        &self,
        _proxy_url: Option<&str>,
        events: mpsc::Sender<GcEvent>,
    ) -> Result<Arc<dyn GcDriver>, FloatdError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        let driver = Arc::new(MockGcDriver {
            script,
            events,
            log_on_calls: AtomicUsize::new(0),
            log_off_calls: AtomicUsize::new(0),
            inspect_calls: AtomicUsize::new(0),
            free_license_calls: AtomicUsize::new(0),
        });
        self.created.lock().unwrap().push(driver.clone());
        Ok(driver)
    }
}
