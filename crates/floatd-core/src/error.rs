// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the floatd service.
//!
//! Every error that can reach an HTTP caller maps onto the stable
//! `{error, code}` envelope table. Bot-internal kinds (`NotReady`,
//! `Timeout`, `Session`, `Shutdown`) fold onto a table entry when they
//! surface in a response.

use serde::Serialize;
use thiserror::Error;

/// The primary error type used across all floatd crates.
#[derive(Debug, Error)]
pub enum FloatdError {
    /// The inspect link could not be parsed or violates the s/m rule.
    #[error("invalid inspect link structure")]
    InvalidInspect,

    /// The caller already has the maximum number of pending requests.
    #[error("you may only have {limit} pending request(s) at a time")]
    MaxRequests { limit: usize },

    /// The game coordinator did not reply within the retry budget.
    #[error("Valve's servers didn't reply in time, please try again later")]
    TtlExceeded,

    /// No bot holds an authenticated session at admission time.
    #[error("Steam is offline, please try again later")]
    SteamOffline,

    /// Unexpected internal failure.
    #[error("something went wrong on our end, please try again")]
    GenericBad,

    /// Request body was oversized or not valid JSON.
    #[error("improperly formatted body")]
    BadBody,

    /// The submitted price key does not match the configured secret.
    #[error("bad secret")]
    BadSecret,

    /// Every ready bot was busy at dispatch time. Does not consume a
    /// retry attempt.
    #[error("no bots available to fulfill this request")]
    NoBotsAvailable,

    /// Fixed-window rate limit exceeded.
    #[error("rate limit exceeded, too many requests")]
    RateLimit,

    /// The scheduler's queue is at capacity.
    #[error("queue is full, please try again later")]
    MaxQueueSize,

    /// The bot has no game-coordinator session.
    #[error("bot is not ready")]
    NotReady,

    /// A single in-flight inspect exceeded its deadline.
    #[error("inspect request timed out")]
    Timeout,

    /// Session-level failure reported by the driver.
    #[error("session error: {0}")]
    Session(String),

    /// The process is shutting down; queued work is rejected.
    #[error("shutting down")]
    Shutdown,

    /// Process-level configuration error (fatal at startup).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure talking to an external HTTP source.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FloatdError {
    /// Stable numeric code from the envelope table.
    ///
    /// Internal kinds fold onto the closest caller-visible entry:
    /// `Timeout` exhausts as `TTLExceeded`, `NotReady` as
    /// `NoBotsAvailable`, everything else as `GenericBad`.
    pub fn code(&self) -> u16 {
        match self {
            FloatdError::InvalidInspect => 2,
            FloatdError::MaxRequests { .. } => 3,
            FloatdError::TtlExceeded | FloatdError::Timeout => 4,
            FloatdError::SteamOffline => 5,
            FloatdError::GenericBad
            | FloatdError::Session(_)
            | FloatdError::Shutdown
            | FloatdError::Config(_)
            | FloatdError::Transport { .. } => 6,
            FloatdError::BadBody => 7,
            FloatdError::BadSecret => 8,
            FloatdError::NoBotsAvailable | FloatdError::NotReady => 9,
            FloatdError::RateLimit => 10,
            FloatdError::MaxQueueSize => 11,
        }
    }

    /// HTTP status the envelope is served with.
    pub fn http_status(&self) -> u16 {
        match self {
            FloatdError::InvalidInspect
            | FloatdError::MaxRequests { .. }
            | FloatdError::BadBody
            | FloatdError::BadSecret
            | FloatdError::MaxQueueSize => 400,
            FloatdError::RateLimit => 429,
            FloatdError::SteamOffline | FloatdError::NoBotsAvailable | FloatdError::NotReady => 503,
            _ => 500,
        }
    }

    /// Renders the caller-visible `{error, code}` envelope.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.to_string(),
            code: self.code(),
        }
    }
}

/// JSON body served for every error response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: u16,
}

impl ErrorEnvelope {
    /// The envelope for a rejected API key. HTTP 403, reuses code 8.
    pub fn invalid_api_key() -> Self {
        Self {
            error: "Invalid API key".to_string(),
            code: 8,
        }
    }
}
