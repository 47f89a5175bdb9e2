// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API-key checks, caller-IP extraction, and the fixed-window rate
//! limiter.
//!
//! POST bodies carry the key as `apiKey`; GET endpoints (which have no
//! body) take it from the `x-api-key` header or the `key` query
//! parameter. When no key is configured the gateway rejects everything
//! (fail-closed).

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Extensions, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use floatd_core::error::FloatdError;

use crate::server::GatewayState;

/// Validates a key against the configured secret. Empty configured keys
/// never match.
pub fn key_matches(state: &GatewayState, presented: Option<&str>) -> bool {
    let expected = &state.config.api_key;
    !expected.is_empty() && presented == Some(expected.as_str())
}

/// Key for a GET request: `x-api-key` header first, then `?key=`.
pub fn get_request_key<'a>(headers: &'a HeaderMap, query_key: Option<&'a str>) -> Option<&'a str> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or(query_key)
}

/// Caller IP: first hop of `X-Forwarded-For` when the deployment trusts
/// its proxy, the socket peer otherwise.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> String {
    if trust_proxy
        && let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Caller IP resolved per [`client_ip`], extracted before the body.
pub struct CallerIp(pub String);

impl axum::extract::FromRequestParts<GatewayState> for CallerIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        Ok(CallerIp(client_ip(
            &parts.headers,
            &parts.extensions,
            state.config.trust_proxy,
        )))
    }
}

/// One caller's fixed window.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub started: Instant,
    pub count: u32,
}

/// Fixed-window rate limiting keyed by caller IP. A no-op when the
/// limiter is disabled.
pub async fn rate_limit_middleware(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    let limit = &state.config.rate_limit;
    if !limit.enabled {
        return next.run(request).await;
    }
    let ip = client_ip(
        request.headers(),
        request.extensions(),
        state.config.trust_proxy,
    );
    let window = std::time::Duration::from_millis(limit.window_ms);
    let now = Instant::now();
    let mut entry = state.rate_windows.entry(ip).or_insert(RateWindow {
        started: now,
        count: 0,
    });
    if now.duration_since(entry.started) >= window {
        entry.started = now;
        entry.count = 0;
    }
    entry.count += 1;
    let over = entry.count > limit.max;
    drop(entry);

    if over {
        return crate::handlers::error_response(&FloatdError::RateLimit);
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_ip_used_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("9.9.9.9, 10.0.0.1"),
        );
        let extensions = Extensions::new();
        assert_eq!(client_ip(&headers, &extensions, true), "9.9.9.9");
        assert_eq!(client_ip(&headers, &extensions, false), "unknown");
    }

    #[test]
    fn socket_peer_is_the_fallback() {
        let headers = HeaderMap::new();
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo("1.2.3.4:9000".parse::<SocketAddr>().unwrap()));
        assert_eq!(client_ip(&headers, &extensions, true), "1.2.3.4");
    }

    #[test]
    fn get_request_key_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("from-header"));
        assert_eq!(
            get_request_key(&headers, Some("from-query")),
            Some("from-header")
        );
        assert_eq!(
            get_request_key(&HeaderMap::new(), Some("from-query")),
            Some("from-query")
        );
        assert_eq!(get_request_key(&HeaderMap::new(), None), None);
    }
}
