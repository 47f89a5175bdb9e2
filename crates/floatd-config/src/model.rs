// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the floatd service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject
//! unrecognized config keys at startup.

use floatd_core::types::LoginCredential;
use serde::{Deserialize, Serialize};

/// Top-level floatd configuration.
///
/// Loaded from a TOML file with `FLOATD_` environment variable
/// overrides. Every section defaults; `logins` is the only key that must
/// be supplied for the service to start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FloatdConfig {
    /// Bot account credentials. One bot per entry.
    #[serde(default)]
    pub logins: Vec<LoginCredential>,

    /// Transport proxies, `http://` or `socks5://`, assigned to logins
    /// round-robin.
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Shared secret callers must present on every request.
    #[serde(default)]
    pub api_key: String,

    /// Secret authorizing price submissions on market links.
    #[serde(default)]
    pub price_key: String,

    /// Maximum outstanding entries per caller IP.
    #[serde(default = "default_max_simultaneous_requests")]
    pub max_simultaneous_requests: usize,

    /// Maximum entries across all priority lanes.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Literal origins reflected in CORS responses.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Regex origins reflected in CORS responses.
    #[serde(default)]
    pub allowed_regex_origins: Vec<String>,

    /// Take the caller IP from `X-Forwarded-For`.
    #[serde(default)]
    pub trust_proxy: bool,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-bot session policy.
    #[serde(default)]
    pub bot_settings: BotSettings,

    /// Fixed-window rate limiter.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Static game metadata refresh.
    #[serde(default)]
    pub game_data: GameDataConfig,

    /// Result cache bounds.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for FloatdConfig {
    fn default() -> Self {
        Self {
            logins: Vec::new(),
            proxies: Vec::new(),
            api_key: String::new(),
            price_key: String::new(),
            max_simultaneous_requests: default_max_simultaneous_requests(),
            max_queue_size: default_max_queue_size(),
            allowed_origins: Vec::new(),
            allowed_regex_origins: Vec::new(),
            trust_proxy: false,
            log_level: default_log_level(),
            http: HttpConfig::default(),
            bot_settings: BotSettings::default(),
            rate_limit: RateLimitConfig::default(),
            game_data: GameDataConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl FloatdConfig {
    /// Proxy assigned to the login at `index`, round-robin over
    /// `proxies`. `None` when no proxies are configured.
    pub fn proxy_for(&self, index: usize) -> Option<&str> {
        if self.proxies.is_empty() {
            None
        } else {
            Some(self.proxies[index % self.proxies.len()].as_str())
        }
    }
}

fn default_max_simultaneous_requests() -> usize {
    1
}

fn default_max_queue_size() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Per-bot session and pacing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotSettings {
    /// Minimum spacing between successive dispatches from one bot.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Deadline for a single in-flight inspect response.
    #[serde(default = "default_request_ttl_ms")]
    pub request_ttl_ms: u64,

    /// In-flight inspects per bot. The wire correlation holds a single
    /// slot; values above 1 are clamped with a warning.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Login deadline.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Pause between login attempts under the failure threshold.
    #[serde(default = "default_login_retry_delay_ms")]
    pub login_retry_delay_ms: u64,

    /// Pause before re-opening the GC subchannel after it drops.
    #[serde(default = "default_gc_reconnect_delay_ms")]
    pub gc_reconnect_delay_ms: u64,

    /// Consecutive login failures before exponential backoff engages.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,

    /// Base scheduled-relogin interval; each cycle adds up to four
    /// minutes of jitter to spread reconnects across the fleet.
    #[serde(default = "default_relogin_interval_secs")]
    pub relogin_interval_secs: u64,

    /// Directory for session material kept by the driver.
    #[serde(default)]
    pub data_directory: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            request_ttl_ms: default_request_ttl_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            connection_timeout_ms: default_connection_timeout_ms(),
            login_retry_delay_ms: default_login_retry_delay_ms(),
            gc_reconnect_delay_ms: default_gc_reconnect_delay_ms(),
            max_login_attempts: default_max_login_attempts(),
            relogin_interval_secs: default_relogin_interval_secs(),
            data_directory: None,
        }
    }
}

fn default_request_delay_ms() -> u64 {
    1_000
}

fn default_request_ttl_ms() -> u64 {
    30_000
}

fn default_max_concurrent_requests() -> usize {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

fn default_login_retry_delay_ms() -> u64 {
    5_000
}

fn default_gc_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_max_login_attempts() -> u32 {
    3
}

fn default_relogin_interval_secs() -> u64 {
    1_800
}

/// Fixed-window rate limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rate_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_rate_max")]
    pub max: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_ms: default_rate_window_ms(),
            max: default_rate_max(),
        }
    }
}

fn default_rate_window_ms() -> u64 {
    60_000
}

fn default_rate_max() -> u32 {
    60
}

/// Static game metadata refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GameDataConfig {
    #[serde(default = "default_game_data_enabled")]
    pub enabled: bool,
    #[serde(default = "default_game_data_interval_secs")]
    pub update_interval_secs: u64,
    #[serde(default = "default_schema_url")]
    pub schema_url: String,
}

impl Default for GameDataConfig {
    fn default() -> Self {
        Self {
            enabled: default_game_data_enabled(),
            update_interval_secs: default_game_data_interval_secs(),
            schema_url: default_schema_url(),
        }
    }
}

fn default_game_data_enabled() -> bool {
    true
}

fn default_game_data_interval_secs() -> u64 {
    43_200
}

fn default_schema_url() -> String {
    "https://csfloat.com/api/v1/schema".to_string()
}

/// Result cache bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
            cleanup_interval_secs: default_cache_cleanup_interval_secs(),
        }
    }
}

fn default_cache_max_entries() -> usize {
    2_000
}

fn default_cache_ttl_secs() -> u64 {
    3_600
}

fn default_cache_cleanup_interval_secs() -> u64 {
    900
}
