// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the floatd service: serde model, layered loading
//! (TOML file + `FLOATD_` env overrides), and startup validation.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config_from_path, load_config_from_str};
pub use model::{
    BotSettings, CacheConfig, FloatdConfig, GameDataConfig, HttpConfig, RateLimitConfig,
};
pub use validation::validate_config;
