// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static game metadata: a periodically refreshed snapshot and the
//! decorator that enriches resolved items with names, rarities, and wear
//! ranges.
//!
//! Refresh failures are logged and non-fatal; the previous snapshot
//! keeps serving.

pub mod schema;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use floatd_config::GameDataConfig;
use floatd_core::FloatdError;
use floatd_core::types::DecoratedItem;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use schema::{PaintDef, Schema, WeaponDef, wear_name};

/// Holds the metadata snapshot and answers enrichment lookups.
pub struct GameData {
    client: reqwest::Client,
    schema_url: String,
    snapshot: RwLock<Option<Schema>>,
}

impl GameData {
    pub fn new(config: &GameDataConfig) -> Result<Self, FloatdError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| FloatdError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            schema_url: config.schema_url.clone(),
            snapshot: RwLock::new(None),
        })
    }

    /// Fetches a fresh snapshot and swaps it in.
    pub async fn refresh(&self) -> Result<(), FloatdError> {
        let response = self
            .client
            .get(&self.schema_url)
            .send()
            .await
            .map_err(|e| FloatdError::Transport {
                message: format!("schema fetch failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .error_for_status()
            .map_err(|e| FloatdError::Transport {
                message: format!("schema fetch returned {e}"),
                source: Some(Box::new(e)),
            })?;

        let schema: Schema = response.json().await.map_err(|e| FloatdError::Transport {
            message: format!("schema decode failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        info!(
            weapons = schema.weapons.len(),
            stickers = schema.stickers.len(),
            "game data snapshot refreshed"
        );
        *self.snapshot.write().expect("schema lock poisoned") = Some(schema);
        Ok(())
    }

    /// Installs a snapshot directly (embedding and tests).
    pub fn install_snapshot(&self, schema: Schema) {
        *self.snapshot.write().expect("schema lock poisoned") = Some(schema);
    }

    /// Whether a snapshot is loaded.
    pub fn is_loaded(&self) -> bool {
        self.snapshot.read().expect("schema lock poisoned").is_some()
    }

    /// Enriches an item in place from the current snapshot. A missing
    /// snapshot or unknown indexes leave the item untouched.
    pub fn annotate(&self, item: &mut DecoratedItem) {
        let guard = self.snapshot.read().expect("schema lock poisoned");
        let Some(schema) = guard.as_ref() else {
            return;
        };

        if let Some(weapon) = schema.weapons.get(&item.defindex.to_string()) {
            item.weapon_type = Some(weapon.name.clone());
            if let Some(paint) = weapon.paints.get(&item.paintindex.to_string()) {
                item.item_name = Some(paint.name.clone());
                item.min = Some(paint.min);
                item.max = Some(paint.max);
                let wear = wear_name(item.floatvalue);
                item.wear_name = Some(wear.to_string());
                item.full_item_name =
                    Some(format!("{} | {} ({})", weapon.name, paint.name, wear));
            }
        }

        if let Some(rarity) = schema.rarities.get(&item.rarity.to_string()) {
            item.rarity_name = Some(rarity.clone());
        }

        for sticker in &mut item.stickers {
            if let Some(name) = schema.stickers.get(&sticker.sticker_id.to_string()) {
                sticker.name = Some(name.clone());
            }
        }
        for keychain in &mut item.keychains {
            if let Some(name) = schema.keychains.get(&keychain.keychain_id.to_string()) {
                keychain.name = Some(name.clone());
            }
        }
    }

    /// Periodic refresh loop; runs until cancelled. The first refresh is
    /// attempted immediately.
    pub async fn run_refresh_loop(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "game data refresh failed, keeping previous snapshot");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("game data refresher shutting down");
                    break;
                }
            }
        }
    }
}
