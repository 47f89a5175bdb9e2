// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared value types: raw game-coordinator payloads, the decorated item
//! record served to HTTP callers, and rank metadata.
//!
//! `DecoratedItem` encodes the response-shape invariants: `paintwear`
//! never appears (its value lives in `floatvalue`), `paintseed` is never
//! null, sticker ids serialize as `stickerId`, and all `None` fields are
//! stripped from the JSON.

use serde::{Deserialize, Serialize};

use crate::link::InspectLink;

/// A single login credential from configuration.
///
/// `shared_secret` feeds the driver's TOTP generator; code generation
/// itself is the driver's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredential {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub shared_secret: Option<String>,
}

impl LoginCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            shared_secret: None,
        }
    }
}

/// Sticker block as echoed by the game coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSticker {
    pub sticker_id: u32,
    pub slot: u32,
    #[serde(default)]
    pub wear: Option<f64>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub tint_id: Option<u32>,
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
}

/// Keychain block as echoed by the game coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawKeychain {
    pub keychain_id: u32,
    pub slot: u32,
    #[serde(default)]
    pub pattern: Option<u32>,
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub offset_z: Option<f64>,
}

/// The item payload of an `inspectItemInfo` event, before post-response
/// processing. `itemid` echoes the requested asset id and is the wire
/// correlation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItemInfo {
    pub itemid: String,
    pub defindex: u32,
    pub paintindex: u32,
    pub rarity: u32,
    pub quality: u32,
    pub paintwear: f64,
    #[serde(default)]
    pub paintseed: Option<u32>,
    #[serde(default)]
    pub origin: Option<u32>,
    #[serde(default)]
    pub customname: Option<String>,
    #[serde(default)]
    pub killeatervalue: Option<u32>,
    #[serde(default)]
    pub stickers: Vec<RawSticker>,
    #[serde(default)]
    pub keychains: Vec<RawKeychain>,
}

/// Sticker in the decorated response. `sticker_id` serializes as
/// `stickerId`; absent fields are stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    #[serde(rename = "stickerId")]
    pub sticker_id: u32,
    pub slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wear: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<f64>,
    /// Sticker name, filled by the game-data decorator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<RawSticker> for Sticker {
    fn from(raw: RawSticker) -> Self {
        Self {
            sticker_id: raw.sticker_id,
            slot: raw.slot,
            wear: raw.wear,
            scale: raw.scale,
            rotation: raw.rotation,
            tint_id: raw.tint_id,
            offset_x: raw.offset_x,
            offset_y: raw.offset_y,
            name: None,
        }
    }
}

/// Keychain in the decorated response, `keychainId` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keychain {
    #[serde(rename = "keychainId")]
    pub keychain_id: u32,
    pub slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_z: Option<f64>,
    /// Keychain name, filled by the game-data decorator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<RawKeychain> for Keychain {
    fn from(raw: RawKeychain) -> Self {
        Self {
            keychain_id: raw.keychain_id,
            slot: raw.slot,
            pattern: raw.pattern,
            offset_x: raw.offset_x,
            offset_y: raw.offset_y,
            offset_z: raw.offset_z,
            name: None,
        }
    }
}

/// Rank metadata for an asset, merged from the externally populated
/// side-table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_rank: Option<u32>,
}

/// The fully decorated item record served to HTTP callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedItem {
    pub a: String,
    pub d: String,
    pub s: String,
    pub m: String,
    pub itemid: String,
    pub defindex: u32,
    pub paintindex: u32,
    pub paintseed: u32,
    pub floatvalue: f64,
    pub rarity: u32,
    pub quality: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killeatervalue: Option<u32>,
    pub stickers: Vec<Sticker>,
    pub keychains: Vec<Keychain>,

    // Enrichment, filled by the game-data decorator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wear_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    // Rank side-table merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_rank: Option<u32>,

    /// Last submitted market price, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
}

impl DecoratedItem {
    /// Shapes a raw coordinator payload into the response record:
    /// `paintwear` becomes `floatvalue`, `paintseed` is coerced from
    /// absent to 0, and `a`/`d`/`s`/`m` are stamped from the original
    /// request regardless of what the coordinator echoed.
    pub fn from_raw(link: &InspectLink, raw: RawItemInfo) -> Self {
        Self {
            a: link.a.clone(),
            d: link.d.clone(),
            s: link.s.clone(),
            m: link.m.clone(),
            itemid: raw.itemid,
            defindex: raw.defindex,
            paintindex: raw.paintindex,
            paintseed: raw.paintseed.unwrap_or(0),
            floatvalue: raw.paintwear,
            rarity: raw.rarity,
            quality: raw.quality,
            origin: raw.origin,
            customname: raw.customname,
            killeatervalue: raw.killeatervalue,
            stickers: raw.stickers.into_iter().map(Sticker::from).collect(),
            keychains: raw.keychains.into_iter().map(Keychain::from).collect(),
            item_name: None,
            weapon_type: None,
            full_item_name: None,
            rarity_name: None,
            wear_name: None,
            min: None,
            max: None,
            low_rank: None,
            high_rank: None,
            price: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_link() -> InspectLink {
        InspectLink::from_fields("6768147729", "12557", Some("76561198084749846"), None).unwrap()
    }

    fn sample_raw() -> RawItemInfo {
        RawItemInfo {
            itemid: "6768147729".to_string(),
            defindex: 7,
            paintindex: 282,
            rarity: 6,
            quality: 4,
            paintwear: 0.067,
            paintseed: None,
            origin: Some(8),
            customname: None,
            killeatervalue: None,
            stickers: vec![RawSticker {
                sticker_id: 5935,
                slot: 2,
                wear: Some(0.12),
                scale: None,
                rotation: None,
                tint_id: None,
                offset_x: None,
                offset_y: None,
            }],
            keychains: vec![],
        }
    }

    #[test]
    fn from_raw_moves_paintwear_to_floatvalue() {
        let item = DecoratedItem::from_raw(&sample_link(), sample_raw());
        assert_eq!(item.floatvalue, 0.067);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("paintwear").is_none());
        assert_eq!(json["floatvalue"], 0.067);
    }

    #[test]
    fn from_raw_coerces_null_paintseed_to_zero() {
        let item = DecoratedItem::from_raw(&sample_link(), sample_raw());
        assert_eq!(item.paintseed, 0);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["paintseed"], 0);
    }

    #[test]
    fn from_raw_stamps_link_fields() {
        let link = sample_link();
        let mut raw = sample_raw();
        // The coordinator does not echo s/m; a mismatched itemid would be
        // dropped before this point, but stamping must not depend on it.
        raw.itemid = "999".to_string();
        let item = DecoratedItem::from_raw(&link, raw);
        assert_eq!(item.a, link.a);
        assert_eq!(item.d, link.d);
        assert_eq!(item.s, link.s);
        assert_eq!(item.m, "0");
    }

    #[test]
    fn sticker_id_serializes_as_sticker_id_camel() {
        let item = DecoratedItem::from_raw(&sample_link(), sample_raw());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["stickers"][0]["stickerId"], 5935);
        assert!(json["stickers"][0].get("sticker_id").is_none());
    }

    #[test]
    fn none_fields_are_stripped_recursively() {
        let item = DecoratedItem::from_raw(&sample_link(), sample_raw());
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("customname").is_none());
        assert!(json.get("item_name").is_none());
        // Sticker scale was None and must not appear as null.
        assert!(json["stickers"][0].get("scale").is_none());
        assert_eq!(json["stickers"][0]["wear"], 0.12);
    }
}
