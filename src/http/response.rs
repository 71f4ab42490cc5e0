//! Response transformation.
//!
//! # Responsibilities
//! - Inject the CORS policy headers on every response leaving the proxy
//! - Answer CORS preflight requests without touching the upstream
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - CORS headers overwrite whatever the upstream set, so the policy is
//!   uniform regardless of upstream behavior
//! - With `allow_credentials` the requesting origin is echoed (plus
//!   `Vary: Origin`); a wildcard origin is invalid for credentialed
//!   requests per the CORS specification

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::CorsConfig;

/// Hop-by-hop headers, never forwarded in either direction (RFC 9110 §7.6.1).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers before forwarding a request or response.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Inject the CORS policy into a response's headers, overwriting any
/// upstream-supplied values.
pub fn apply_cors_headers(headers: &mut HeaderMap, cors: &CorsConfig, origin: Option<&HeaderValue>) {
    let allow_origin = if cors.allow_credentials {
        // Echo the requesting origin; fall back to the configured value for
        // non-browser clients that sent no Origin header.
        origin.cloned().unwrap_or_else(|| configured_origin(cors))
    } else {
        configured_origin(cors)
    };
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);

    if let Ok(value) = HeaderValue::from_str(&cors.allow_methods) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&cors.allow_headers) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
    }

    if cors.allow_credentials {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(header::VARY, HeaderValue::from_static("origin"));
    }
}

fn configured_origin(cors: &CorsConfig) -> HeaderValue {
    HeaderValue::from_str(&cors.allow_origin).unwrap_or_else(|_| HeaderValue::from_static("*"))
}

/// Synthetic answer for an intercepted preflight request: 200, empty body.
/// The policy headers themselves come from the response layer.
pub fn preflight_response(cors: &CorsConfig) -> Response {
    let mut response = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(&cors.max_age_secs.to_string()) {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_MAX_AGE, value);
    }
    response
}

/// Middleware injecting the CORS policy on every response.
pub async fn cors_middleware(
    State(cors): State<Arc<CorsConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), &cors, origin.as_ref());
    response
}
