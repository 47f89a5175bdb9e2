// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! `POST /inspect` resolves one link, `POST /bulk` resolves a batch,
//! `GET /stats` and `GET /relog` are admin operations, `GET /health` is
//! the public liveness probe. Every error is served as the stable
//! `{error, code}` envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use floatd_core::error::{ErrorEnvelope, FloatdError};
use floatd_core::link::InspectLink;
use floatd_queue::{DEFAULT_MAX_ATTEMPTS, Job, JobError, JobOutcome, QueueEntry};

use crate::auth::{self, CallerIp};
use crate::server::GatewayState;

/// Priority used when the caller omits one or sends garbage.
const DEFAULT_PRIORITY: usize = 4;

/// Request body for `POST /inspect`.
#[derive(Debug, Deserialize)]
pub struct InspectRequest {
    #[serde(default, rename = "apiKey")]
    pub api_key: Option<String>,
    /// `steam://` preview URL form.
    #[serde(default)]
    pub url: Option<String>,
    /// Structured form.
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub m: Option<String>,
    /// 1 (highest) .. 5 (lowest); anything else becomes 4.
    #[serde(default)]
    pub priority: Option<serde_json::Value>,
    #[serde(default, rename = "priceKey")]
    pub price_key: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
}

/// One entry of a `POST /bulk` request.
#[derive(Debug, Deserialize)]
pub struct BulkLinkEntry {
    /// `steam://` preview URL form.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub m: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
}

/// Request body for `POST /bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    #[serde(default, rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub links: Vec<BulkLinkEntry>,
    #[serde(default)]
    pub priority: Option<serde_json::Value>,
    #[serde(default, rename = "priceKey")]
    pub price_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub bots_online: usize,
    pub bots_total: usize,
    pub queue_size: usize,
    pub queue_concurrency: usize,
    pub currently_processing_size: usize,
}

#[derive(Debug, Serialize)]
pub struct RelogResponse {
    pub issued_relog: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: Option<String>,
}

/// Serves the stable envelope for an error.
pub fn error_response(err: &FloatdError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.envelope())).into_response()
}

fn job_error_response(err: &JobError) -> Response {
    let status =
        StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.envelope.clone())).into_response()
}

fn invalid_key_response() -> Response {
    (StatusCode::FORBIDDEN, Json(ErrorEnvelope::invalid_api_key())).into_response()
}

/// POST /inspect
pub async fn post_inspect(
    State(state): State<GatewayState>,
    CallerIp(ip): CallerIp,
    payload: Result<Json<InspectRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = payload else {
        return error_response(&FloatdError::BadBody);
    };
    if !auth::key_matches(&state, body.api_key.as_deref()) {
        return invalid_key_response();
    }
    let link = match resolve_link(
        body.url.as_deref(),
        body.a.as_deref(),
        body.d.as_deref(),
        body.s.as_deref(),
        body.m.as_deref(),
    ) {
        Ok(link) => link,
        Err(e) => return error_response(&e),
    };
    let priority = resolve_priority(body.priority.as_ref());
    let price = match submitted_price(&state, body.price_key.as_deref(), body.price, &link) {
        Ok(price) => price,
        Err(e) => return error_response(&e),
    };
    match process_job(&state, ip, vec![(link, price)], priority, false).await {
        Ok(outcome) => render_outcome(outcome),
        Err(e) => error_response(&e),
    }
}

/// POST /bulk
pub async fn post_bulk(
    State(state): State<GatewayState>,
    CallerIp(ip): CallerIp,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = payload else {
        return error_response(&FloatdError::BadBody);
    };
    if !auth::key_matches(&state, body.api_key.as_deref()) {
        return invalid_key_response();
    }
    if body.links.is_empty() {
        return error_response(&FloatdError::InvalidInspect);
    }
    let price_key_ok = match body.price_key.as_deref() {
        None => false,
        Some(k) => {
            if !state.config.price_key.is_empty() && k == state.config.price_key {
                true
            } else {
                return error_response(&FloatdError::BadSecret);
            }
        }
    };
    let mut links = Vec::with_capacity(body.links.len());
    for entry in &body.links {
        let link = match resolve_link(
            entry.link.as_deref(),
            entry.a.as_deref(),
            entry.d.as_deref(),
            entry.s.as_deref(),
            entry.m.as_deref(),
        ) {
            Ok(link) => link,
            Err(e) => return error_response(&e),
        };
        let price = if price_key_ok && link.is_market_link() {
            entry.price
        } else {
            None
        };
        links.push((link, price));
    }
    let priority = resolve_priority(body.priority.as_ref());
    match process_job(&state, ip, links, priority, true).await {
        Ok(outcome) => render_outcome(outcome),
        Err(e) => error_response(&e),
    }
}

/// GET /stats
pub async fn get_stats(
    State(state): State<GatewayState>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
) -> Response {
    let key = auth::get_request_key(&headers, query.key.as_deref());
    if !auth::key_matches(&state, key) {
        return invalid_key_response();
    }
    Json(StatsResponse {
        bots_online: state.controller.ready_count(),
        bots_total: state.controller.bot_count(),
        queue_size: state.scheduler.size(),
        queue_concurrency: state.scheduler.concurrency(),
        currently_processing_size: state.scheduler.processing_count(),
    })
    .into_response()
}

/// GET /relog
pub async fn get_relog(
    State(state): State<GatewayState>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
) -> Response {
    let key = auth::get_request_key(&headers, query.key.as_deref());
    if !auth::key_matches(&state, key) {
        return invalid_key_response();
    }
    info!("relog requested via admin endpoint");
    state.controller.try_relog_all().await;
    Json(RelogResponse { issued_relog: true }).into_response()
}

/// GET /health (unauthenticated)
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Canonicalizes either accepted link shape.
fn resolve_link(
    url: Option<&str>,
    a: Option<&str>,
    d: Option<&str>,
    s: Option<&str>,
    m: Option<&str>,
) -> Result<InspectLink, FloatdError> {
    if let Some(url) = url {
        return InspectLink::parse_url(url);
    }
    match (a, d) {
        (Some(a), Some(d)) => InspectLink::from_fields(a, d, s, m),
        _ => Err(FloatdError::InvalidInspect),
    }
}

/// 1..=5 passes through; anything else (missing, wrong type, out of
/// range) becomes the default.
fn resolve_priority(priority: Option<&serde_json::Value>) -> usize {
    priority
        .and_then(serde_json::Value::as_u64)
        .filter(|p| (1..=5).contains(p))
        .map(|p| p as usize)
        .unwrap_or(DEFAULT_PRIORITY)
}

/// Validates a price submission. A wrong price key is `BadSecret`; a
/// valid one attaches the price on market links only.
fn submitted_price(
    state: &GatewayState,
    price_key: Option<&str>,
    price: Option<u64>,
    link: &InspectLink,
) -> Result<Option<u64>, FloatdError> {
    let Some(key) = price_key else {
        return Ok(None);
    };
    if state.config.price_key.is_empty() || key != state.config.price_key {
        return Err(FloatdError::BadSecret);
    }
    if link.is_market_link() { Ok(price) } else { Ok(None) }
}

/// Builds the job, serves cache hits, checks admission, enqueues the
/// misses, and waits for the aggregated outcome.
async fn process_job(
    state: &GatewayState,
    ip: String,
    links: Vec<(InspectLink, Option<u64>)>,
    priority: usize,
    bulk: bool,
) -> Result<JobOutcome, FloatdError> {
    let (job, rx) = Job::new(ip.clone(), bulk);
    for (link, price) in links {
        job.add(link, price);
    }

    // Cache short-circuit: hits are filled immediately, misses go to the
    // scheduler.
    let pending = job.remaining_links();
    let asset_ids: Vec<&str> = pending.iter().map(|(l, _)| l.a.as_str()).collect();
    let hits = state.cache.get_many(&asset_ids);
    let mut misses = Vec::new();
    for ((link, price), hit) in pending.iter().zip(hits) {
        match hit {
            Some(cached) => {
                debug!(asset_id = %link.a, "cache hit");
                let mut item = cached.item.clone();
                if let Some(p) = *price {
                    state.cache.update_price(&link.a, p);
                    item.price = Some(p);
                }
                job.set_response(&link.a, Ok(item));
            }
            None => misses.push((link.clone(), *price)),
        }
    }

    if !misses.is_empty() {
        if state.controller.ready_count() == 0 {
            job.set_response_remaining(&FloatdError::SteamOffline);
        } else {
            let remaining = misses.len();
            let limit = state.config.max_simultaneous_requests;
            if state.scheduler.user_queued(&ip) + remaining > limit {
                return Err(FloatdError::MaxRequests { limit });
            }
            if state.scheduler.size() + remaining > state.config.max_queue_size {
                return Err(FloatdError::MaxQueueSize);
            }
            for (link, price) in misses {
                state.scheduler.enqueue(QueueEntry {
                    link,
                    price,
                    ip: ip.clone(),
                    priority,
                    attempts: 0,
                    max_attempts: DEFAULT_MAX_ATTEMPTS,
                    job: job.clone(),
                });
            }
        }
    }

    rx.await.map_err(|_| FloatdError::GenericBad)
}

/// Renders the aggregated outcome: the bare item (or envelope) for a
/// single-link job, an array for bulk.
fn render_outcome(outcome: JobOutcome) -> Response {
    if outcome.bulk {
        let values: Vec<serde_json::Value> = outcome
            .results
            .into_iter()
            .map(|(_, result)| match result {
                Ok(item) => serde_json::to_value(item).unwrap_or_default(),
                Err(err) => serde_json::to_value(&err.envelope).unwrap_or_default(),
            })
            .collect();
        (StatusCode::OK, Json(values)).into_response()
    } else {
        match outcome.results.into_iter().next() {
            Some((_, Ok(item))) => (StatusCode::OK, Json(item)).into_response(),
            Some((_, Err(err))) => job_error_response(&err),
            None => error_response(&FloatdError::GenericBad),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use floatd_bot::{BotController, spawn_bot};
    use floatd_cache::ResultCache;
    use floatd_config::{BotSettings, FloatdConfig, GameDataConfig};
    use floatd_core::types::{LoginCredential, RawItemInfo};
    use floatd_gamedata::GameData;
    use floatd_queue::Scheduler;
    use floatd_test_utils::{MockGcFactory, wait_for};
    use http_body_util::BodyExt;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::server::{GatewayConfig, GatewayState, build_router};

    const KEY: &str = "test-api-key";

    struct TestStack {
        router: axum::Router,
        state: GatewayState,
        cancel: CancellationToken,
    }

    async fn stack(ready_bots: usize, mutate: impl FnOnce(&mut FloatdConfig)) -> TestStack {
        let mut config = FloatdConfig::default();
        config.api_key = KEY.to_string();
        config.trust_proxy = true;
        mutate(&mut config);

        let cache = Arc::new(ResultCache::new(
            config.cache.max_entries,
            Duration::from_secs(config.cache.ttl_secs),
        ));
        let game_data = Arc::new(GameData::new(&GameDataConfig::default()).unwrap());
        let factory = Arc::new(MockGcFactory::new());
        let cancel = CancellationToken::new();
        let settings = BotSettings {
            request_delay_ms: 10,
            login_retry_delay_ms: 20,
            ..BotSettings::default()
        };
        let mut controller = BotController::new();
        for i in 0..ready_bots {
            controller.add_bot(spawn_bot(
                LoginCredential::new(format!("bot{i}"), "pw"),
                None,
                &settings,
                factory.clone(),
                cache.clone(),
                game_data.clone(),
                cancel.clone(),
            ));
        }
        let controller = Arc::new(controller);
        let scheduler = Scheduler::new(controller.clone());
        if ready_bots > 0 {
            assert!(
                wait_for(
                    || async { controller.ready_count() == ready_bots },
                    Duration::from_secs(2)
                )
                .await,
                "fleet never became ready"
            );
        }
        let state = GatewayState::new(
            controller,
            scheduler,
            cache,
            GatewayConfig::from_config(&config).unwrap(),
        );
        TestStack {
            router: build_router(state.clone()),
            state,
            cancel,
        }
    }

    fn inspect_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/inspect")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "4.4.4.4")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn cached_item(a: &str) -> floatd_core::types::DecoratedItem {
        let link = InspectLink::from_fields(a, "1", Some("2"), None).unwrap();
        floatd_core::types::DecoratedItem::from_raw(
            &link,
            RawItemInfo {
                itemid: a.to_string(),
                defindex: 7,
                paintindex: 282,
                rarity: 6,
                quality: 4,
                paintwear: 0.11,
                paintseed: Some(3),
                origin: None,
                customname: None,
                killeatervalue: None,
                stickers: vec![],
                keychains: vec![],
            },
        )
    }

    #[tokio::test]
    async fn wrong_api_key_is_403_code_8() {
        let t = stack(0, |_| {}).await;
        let response = t
            .router
            .oneshot(inspect_request(r#"{"apiKey":"nope","a":"1","d":"2","s":"3"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], 8);
        assert_eq!(json["error"], "Invalid API key");
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn malformed_json_is_bad_body() {
        let t = stack(0, |_| {}).await;
        let response = t.router.oneshot(inspect_request("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], 7);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn unparseable_link_is_invalid_inspect() {
        let t = stack(0, |_| {}).await;
        let body = format!(r#"{{"apiKey":"{KEY}","url":"https://not-a-link"}}"#);
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], 2);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn fleet_down_with_cold_cache_is_steam_offline() {
        let t = stack(0, |_| {}).await;
        let body = format!(r#"{{"apiKey":"{KEY}","a":"7","d":"2","s":"3"}}"#);
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["code"], 5);
        // No per-caller accounting may survive the rejection.
        assert_eq!(t.state.scheduler.user_queued("4.4.4.4"), 0);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn cached_asset_is_served_without_dispatch() {
        let t = stack(0, |_| {}).await;
        t.state.cache.insert(cached_item("7"), Some(1200));
        let body = format!(r#"{{"apiKey":"{KEY}","a":"7","d":"1","s":"2"}}"#);
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["a"], "7");
        assert_eq!(json["floatvalue"], 0.11);
        assert_eq!(json["price"], 1200);
        assert_eq!(t.state.scheduler.size(), 0);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn admission_refuses_over_per_caller_limit() {
        let t = stack(1, |c| c.max_simultaneous_requests = 2).await;
        // Two entries already outstanding for this caller.
        let (job, _rx) = Job::new("9.9.9.9".to_string(), true);
        for a in ["100", "101"] {
            let link = InspectLink::from_fields(a, "1", Some("2"), None).unwrap();
            job.add(link.clone(), None);
            t.state.scheduler.enqueue(QueueEntry {
                link,
                price: None,
                ip: "9.9.9.9".to_string(),
                priority: 3,
                attempts: 0,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                job: job.clone(),
            });
        }
        assert_eq!(t.state.scheduler.user_queued("9.9.9.9"), 2);

        let body = format!(r#"{{"apiKey":"{KEY}","a":"102","d":"1","s":"2"}}"#);
        let request = Request::builder()
            .method("POST")
            .uri("/inspect")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "9.9.9.9")
            .body(Body::from(body))
            .unwrap();
        let response = t.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], 3);
        // No new entry was added.
        assert_eq!(t.state.scheduler.user_queued("9.9.9.9"), 2);
        assert_eq!(t.state.scheduler.size(), 2);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn admission_refuses_over_queue_capacity() {
        let t = stack(1, |c| c.max_queue_size = 1).await;
        let (job, _rx) = Job::new("8.8.8.8".to_string(), false);
        let link = InspectLink::from_fields("200", "1", Some("2"), None).unwrap();
        job.add(link.clone(), None);
        t.state.scheduler.enqueue(QueueEntry {
            link,
            price: None,
            ip: "8.8.8.8".to_string(),
            priority: 3,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            job,
        });

        let body = format!(r#"{{"apiKey":"{KEY}","a":"201","d":"1","s":"2"}}"#);
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], 11);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn wrong_price_key_is_bad_secret() {
        let t = stack(0, |c| c.price_key = "secret".to_string()).await;
        let body = format!(
            r#"{{"apiKey":"{KEY}","m":"625","a":"7","d":"1","priceKey":"wrong","price":100}}"#
        );
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], 8);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn valid_price_key_updates_cached_market_item() {
        let t = stack(0, |c| c.price_key = "secret".to_string()).await;
        let link = InspectLink::from_fields("7", "1", None, Some("625")).unwrap();
        let item = floatd_core::types::DecoratedItem::from_raw(
            &link,
            RawItemInfo {
                itemid: "7".to_string(),
                defindex: 7,
                paintindex: 282,
                rarity: 6,
                quality: 4,
                paintwear: 0.3,
                paintseed: Some(1),
                origin: None,
                customname: None,
                killeatervalue: None,
                stickers: vec![],
                keychains: vec![],
            },
        );
        t.state.cache.insert(item, None);

        let body = format!(
            r#"{{"apiKey":"{KEY}","m":"625","a":"7","d":"1","priceKey":"secret","price":4200}}"#
        );
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["price"], 4200);
        let cached = t.state.cache.get_many(&["7"]);
        assert_eq!(cached[0].as_ref().unwrap().price, Some(4200));
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn bulk_mixes_hits_and_offline_envelopes() {
        let t = stack(0, |_| {}).await;
        t.state.cache.insert(cached_item("300"), None);
        let body = format!(
            r#"{{"apiKey":"{KEY}","links":[{{"a":"300","d":"1","s":"2"}},{{"a":"301","d":"1","s":"2"}}]}}"#
        );
        let request = Request::builder()
            .method("POST")
            .uri("/bulk")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = t.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["a"], "300");
        assert_eq!(array[1]["code"], 5);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn stats_requires_key_and_reports_fleet() {
        let t = stack(2, |_| {}).await;

        let unauthed = Request::builder()
            .method("GET")
            .uri("/stats")
            .body(Body::empty())
            .unwrap();
        let response = t.router.clone().oneshot(unauthed).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let authed = Request::builder()
            .method("GET")
            .uri(format!("/stats?key={KEY}"))
            .body(Body::empty())
            .unwrap();
        let response = t.router.oneshot(authed).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["bots_online"], 2);
        assert_eq!(json["bots_total"], 2);
        assert_eq!(json["queue_size"], 0);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn relog_accepts_header_key() {
        let t = stack(1, |_| {}).await;
        let request = Request::builder()
            .method("GET")
            .uri("/relog")
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap();
        let response = t.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["issued_relog"], true);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn health_is_public() {
        let t = stack(0, |_| {}).await;
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = t.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn rate_limiter_rejects_over_window_max() {
        let t = stack(0, |c| {
            c.rate_limit.enabled = true;
            c.rate_limit.window_ms = 60_000;
            c.rate_limit.max = 2;
        })
        .await;
        let body = format!(r#"{{"apiKey":"{KEY}","a":"1","d":"2","s":"3"}}"#);
        for _ in 0..2 {
            let response = t
                .router
                .clone()
                .oneshot(inspect_request(&body))
                .await
                .unwrap();
            assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
        let response = t.router.oneshot(inspect_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await["code"], 10);
        t.cancel.cancel();
    }

    #[tokio::test]
    async fn cors_reflects_configured_origin_on_get() {
        let t = stack(0, |c| {
            c.allowed_origins = vec!["https://floatd.example".to_string()];
        })
        .await;
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .header("origin", "https://floatd.example")
            .body(Body::empty())
            .unwrap();
        let response = t.router.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("https://floatd.example")
        );

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .header("origin", "https://other.example")
            .body(Body::empty())
            .unwrap();
        let response = t.router.oneshot(request).await.unwrap();
        assert!(
            response
                .headers()
                .get("access-control-allow-origin")
                .is_none()
        );
        t.cancel.cancel();
    }

    #[test]
    fn priority_defaults_for_garbage_values() {
        assert_eq!(resolve_priority(None), 4);
        assert_eq!(resolve_priority(Some(&serde_json::json!(1))), 1);
        assert_eq!(resolve_priority(Some(&serde_json::json!(5))), 5);
        assert_eq!(resolve_priority(Some(&serde_json::json!(0))), 4);
        assert_eq!(resolve_priority(Some(&serde_json::json!(9))), 4);
        assert_eq!(resolve_priority(Some(&serde_json::json!("2"))), 4);
        assert_eq!(resolve_priority(Some(&serde_json::json!({}))), 4);
    }

    #[test]
    fn stats_response_serializes_expected_fields() {
        let stats = StatsResponse {
            bots_online: 1,
            bots_total: 2,
            queue_size: 3,
            queue_concurrency: 1,
            currently_processing_size: 0,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"bots_online\":1"));
        assert!(json.contains("\"currently_processing_size\":0"));
    }
}
