// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inspect-link parsing and normalization.
//!
//! Accepts the `steam://` preview URL and the structured `{a, d, s?, m?}`
//! form, producing the canonical `{s, a, d, m}` tuple. Exactly one of
//! `s` (owner steamid) or `m` (market listing id) is non-"0". Pure, no
//! I/O.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FloatdError;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^steam://rungame/730/\d+/\+csgo_econ_action_preview(?:%20| )([SM])(\d+)A(\d+)D(\d+)$",
    )
    .expect("inspect URL regex is valid")
});

/// Canonical inspect link.
///
/// All fields are opaque decimal strings; `a` (asset id) is the primary
/// key everywhere downstream. Equality is by tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InspectLink {
    /// Owner steamid, or "0" for market links.
    pub s: String,
    /// Asset id.
    pub a: String,
    /// Decimal correlation value.
    pub d: String,
    /// Market listing id, or "0" for owned items.
    pub m: String,
}

impl InspectLink {
    /// Parses a `steam://rungame/730/...` preview URL.
    pub fn parse_url(url: &str) -> Result<Self, FloatdError> {
        let caps = URL_RE.captures(url).ok_or(FloatdError::InvalidInspect)?;
        let id = caps[2].to_string();
        let (s, m) = match &caps[1] {
            "S" => (id, "0".to_string()),
            _ => ("0".to_string(), id),
        };
        Self::from_parts(s, caps[3].to_string(), caps[4].to_string(), m)
    }

    /// Builds a link from already-split fields, enforcing the canonical
    /// rules: `a` and `d` are non-empty decimal strings, and exactly one
    /// of `s`/`m` is non-"0".
    pub fn from_parts(s: String, a: String, d: String, m: String) -> Result<Self, FloatdError> {
        if !is_decimal(&a) || !is_decimal(&d) || !is_decimal(&s) || !is_decimal(&m) {
            return Err(FloatdError::InvalidInspect);
        }
        if (s == "0") == (m == "0") {
            return Err(FloatdError::InvalidInspect);
        }
        Ok(Self { s, a, d, m })
    }

    /// Builds a link from the structured request form, where the absent
    /// side of `s`/`m` defaults to "0".
    pub fn from_fields(
        a: &str,
        d: &str,
        s: Option<&str>,
        m: Option<&str>,
    ) -> Result<Self, FloatdError> {
        Self::from_parts(
            s.unwrap_or("0").to_string(),
            a.to_string(),
            d.to_string(),
            m.unwrap_or("0").to_string(),
        )
    }

    /// A market link carries a listing id instead of an owner.
    pub fn is_market_link(&self) -> bool {
        self.s == "0"
    }

    /// The owner field the game coordinator expects: the steamid for
    /// owned items, the listing id for market links.
    pub fn owner(&self) -> &str {
        if self.is_market_link() { &self.m } else { &self.s }
    }
}

fn is_decimal(v: &str) -> bool {
    !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNED: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20S76561198084749846A6768147729D12557175561287951743";
    const MARKET: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M625254122282020305A6760346663D30614827701953021";

    #[test]
    fn parses_owned_url() {
        let link = InspectLink::parse_url(OWNED).unwrap();
        assert_eq!(link.s, "76561198084749846");
        assert_eq!(link.a, "6768147729");
        assert_eq!(link.d, "12557175561287951743");
        assert_eq!(link.m, "0");
        assert!(!link.is_market_link());
        assert_eq!(link.owner(), "76561198084749846");
    }

    #[test]
    fn parses_market_url() {
        let link = InspectLink::parse_url(MARKET).unwrap();
        assert_eq!(link.s, "0");
        assert_eq!(link.m, "625254122282020305");
        assert!(link.is_market_link());
        assert_eq!(link.owner(), "625254122282020305");
    }

    #[test]
    fn parses_url_with_literal_space() {
        let url = OWNED.replace("%20", " ");
        let link = InspectLink::parse_url(&url).unwrap();
        assert_eq!(link.a, "6768147729");
    }

    #[test]
    fn rejects_malformed_urls() {
        for bad in [
            "",
            "https://example.com",
            "steam://rungame/440/123/+csgo_econ_action_preview%20S1A2D3",
            "steam://rungame/730/123/+csgo_econ_action_preview%20X1A2D3",
            "steam://rungame/730/123/+csgo_econ_action_preview%20S1A2",
            "steam://rungame/730/123/+csgo_econ_action_preview%20S1A2D3trailing",
        ] {
            assert!(
                matches!(InspectLink::parse_url(bad), Err(FloatdError::InvalidInspect)),
                "should reject {bad:?}"
            );
        }
    }

    #[test]
    fn structured_form_defaults_missing_side_to_zero() {
        let link = InspectLink::from_fields("42", "99", Some("7656"), None).unwrap();
        assert_eq!(link.m, "0");
        let link = InspectLink::from_fields("42", "99", None, Some("625")).unwrap();
        assert_eq!(link.s, "0");
        assert!(link.is_market_link());
    }

    #[test]
    fn structured_form_rejects_both_or_neither() {
        assert!(InspectLink::from_fields("42", "99", None, None).is_err());
        assert!(InspectLink::from_fields("42", "99", Some("1"), Some("2")).is_err());
        // Explicit zeros on both sides are "neither".
        assert!(InspectLink::from_fields("42", "99", Some("0"), Some("0")).is_err());
    }

    #[test]
    fn structured_form_rejects_non_decimal() {
        assert!(InspectLink::from_fields("abc", "99", Some("1"), None).is_err());
        assert!(InspectLink::from_fields("42", "", Some("1"), None).is_err());
        assert!(InspectLink::from_fields("42", "99", Some("-1"), None).is_err());
    }

    #[test]
    fn equality_is_by_tuple() {
        let a = InspectLink::parse_url(OWNED).unwrap();
        let b = InspectLink::parse_url(OWNED).unwrap();
        assert_eq!(a, b);
        let c = InspectLink::parse_url(MARKET).unwrap();
        assert_ne!(a, c);
    }
}
