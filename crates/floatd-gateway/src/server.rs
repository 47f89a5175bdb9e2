// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware (body cap, rate limiter, CORS), and the
//! shared state for the handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Router, middleware};
use dashmap::DashMap;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};

use floatd_bot::BotController;
use floatd_cache::ResultCache;
use floatd_config::{FloatdConfig, RateLimitConfig};
use floatd_core::error::FloatdError;
use floatd_queue::Scheduler;

use crate::auth::{self, RateWindow};
use crate::handlers;

/// Request body cap.
pub const BODY_LIMIT: usize = 5 * 1024 * 1024;

/// The slice of configuration the gateway serves from, with origin
/// regexes pre-compiled.
pub struct GatewayConfig {
    pub api_key: String,
    pub price_key: String,
    pub max_simultaneous_requests: usize,
    pub max_queue_size: usize,
    pub trust_proxy: bool,
    pub rate_limit: RateLimitConfig,
    pub allowed_origins: Vec<String>,
    pub allowed_regex_origins: Vec<Regex>,
}

impl GatewayConfig {
    pub fn from_config(config: &FloatdConfig) -> Result<Self, FloatdError> {
        let allowed_regex_origins = config
            .allowed_regex_origins
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    FloatdError::Config(format!("allowed_regex_origins `{p}`: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            price_key: config.price_key.clone(),
            max_simultaneous_requests: config.max_simultaneous_requests,
            max_queue_size: config.max_queue_size,
            trust_proxy: config.trust_proxy,
            rate_limit: config.rate_limit.clone(),
            allowed_origins: config.allowed_origins.clone(),
            allowed_regex_origins,
        })
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"[redacted]")
            .field("price_key", &"[redacted]")
            .field(
                "max_simultaneous_requests",
                &self.max_simultaneous_requests,
            )
            .field("max_queue_size", &self.max_queue_size)
            .field("trust_proxy", &self.trust_proxy)
            .finish_non_exhaustive()
    }
}

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: Arc<BotController>,
    pub scheduler: Arc<Scheduler>,
    pub cache: Arc<ResultCache>,
    pub config: Arc<GatewayConfig>,
    pub start_time: std::time::Instant,
    pub rate_windows: Arc<DashMap<String, RateWindow>>,
}

impl GatewayState {
    pub fn new(
        controller: Arc<BotController>,
        scheduler: Arc<Scheduler>,
        cache: Arc<ResultCache>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            controller,
            scheduler,
            cache,
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
            rate_windows: Arc::new(DashMap::new()),
        }
    }
}

/// Assembles the gateway router.
///
/// - `POST /inspect`, `POST /bulk`: resolution endpoints, rate limited.
/// - `GET /stats`, `GET /relog`: admin endpoints, API key via header or
///   query.
/// - `GET /health`: unauthenticated liveness probe.
pub fn build_router(state: GatewayState) -> Router {
    let resolve_routes = Router::new()
        .route("/inspect", post(handlers::post_inspect))
        .route("/bulk", post(handlers::post_bulk))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit_middleware,
        ));

    let admin_routes = Router::new()
        .route("/stats", get(handlers::get_stats))
        .route("/relog", get(handlers::get_relog));

    let public_routes = Router::new().route("/health", get(handlers::get_health));

    let cors = cors_layer(&state.config);
    let mut router = Router::new()
        .merge(resolve_routes)
        .merge(admin_routes)
        .merge(public_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

/// CORS reflection for configured origins; absent when none are
/// configured.
fn cors_layer(config: &GatewayConfig) -> Option<CorsLayer> {
    if config.allowed_origins.is_empty() && config.allowed_regex_origins.is_empty() {
        return None;
    }
    let literals = config.allowed_origins.clone();
    let regexes = config.allowed_regex_origins.clone();
    let predicate = move |origin: &HeaderValue, _parts: &axum::http::request::Parts| {
        let Ok(origin) = origin.to_str() else {
            return false;
        };
        literals.iter().any(|o| o == origin) || regexes.iter().any(|re| re.is_match(origin))
    };
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(predicate))
            .allow_methods([Method::GET]),
    )
}

/// Binds and serves until the token is cancelled.
pub async fn serve(
    host: &str,
    port: u16,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), FloatdError> {
    let router = build_router(state);
    let addr = format!("{host}:{port}");
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| FloatdError::Transport {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;
    tracing::info!(addr = %addr, "gateway listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(cancel.cancelled_owned())
    .await
    .map_err(|e| FloatdError::Transport {
        message: format!("gateway server error: {e}"),
        source: Some(Box::new(e)),
    })
}
