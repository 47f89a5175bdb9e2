// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults, then the TOML file, then `FLOATD_`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FloatdConfig;

/// Load configuration from a TOML file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FloatdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FloatdConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an in-memory TOML string (tests and explicit
/// embedding).
pub fn load_config_from_str(toml_content: &str) -> Result<FloatdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FloatdConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `FLOATD_RATE_LIMIT_WINDOW_MS` must
/// map to `rate_limit.window_ms`, not `rate.limit.window.ms`.
fn env_provider() -> Env {
    Env::prefixed("FLOATD_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("http_", "http.", 1)
            .replacen("bot_settings_", "bot_settings.", 1)
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("game_data_", "game_data.", 1)
            .replacen("cache_", "cache.", 1);
        mapped.into()
    })
}
