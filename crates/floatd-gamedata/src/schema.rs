// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema types for the static game metadata snapshot.

use std::collections::HashMap;

use serde::Deserialize;

/// One weapon definition, keyed by defindex in [`Schema::weapons`].
#[derive(Debug, Clone, Deserialize)]
pub struct WeaponDef {
    /// Base weapon name, e.g. "AK-47".
    pub name: String,
    /// Paint definitions keyed by paintindex.
    #[serde(default)]
    pub paints: HashMap<String, PaintDef>,
}

/// One finish definition.
#[derive(Debug, Clone, Deserialize)]
pub struct PaintDef {
    /// Finish name, e.g. "Redline".
    pub name: String,
    /// Lowest reachable wear for this finish.
    #[serde(default)]
    pub min: f64,
    /// Highest reachable wear for this finish.
    #[serde(default = "default_max_wear")]
    pub max: f64,
}

fn default_max_wear() -> f64 {
    1.0
}

/// The full metadata snapshot fetched from the schema source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    /// Weapons keyed by defindex.
    #[serde(default)]
    pub weapons: HashMap<String, WeaponDef>,
    /// Sticker names keyed by sticker id.
    #[serde(default)]
    pub stickers: HashMap<String, String>,
    /// Keychain names keyed by keychain id.
    #[serde(default)]
    pub keychains: HashMap<String, String>,
    /// Rarity names keyed by rarity index.
    #[serde(default)]
    pub rarities: HashMap<String, String>,
}

/// The conventional wear bracket for a float value.
pub fn wear_name(floatvalue: f64) -> &'static str {
    if floatvalue < 0.07 {
        "Factory New"
    } else if floatvalue < 0.15 {
        "Minimal Wear"
    } else if floatvalue < 0.38 {
        "Field-Tested"
    } else if floatvalue < 0.45 {
        "Well-Worn"
    } else {
        "Battle-Scarred"
    }
}
