//! Request identity and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Preserve an inbound `x-request-id` when the client already sent one
//! - Expose the ID to handlers via a request extension
//!
//! # Design Decisions
//! - Implemented as a tower layer so the ID exists before any routing
//! - The header is always present downstream of the layer; handlers read
//!   it without a fallback path

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the request ID, inbound and toward the upstream.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(String);

impl RequestId {
    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tower layer attaching a request ID to every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service produced by [`RequestIdLayer`].
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Ok(value) = HeaderValue::from_str(&id) {
            req.headers_mut().insert(X_REQUEST_ID, value);
        }
        req.extensions_mut().insert(RequestId(id));

        self.inner.call(req)
    }
}

/// Extension trait for reading the request ID off a request.
pub trait RequestIdExt {
    /// The request ID attached by [`RequestIdLayer`].
    fn request_id(&self) -> &str;
}

impl RequestIdExt for Request<Body> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .map(RequestId::as_str)
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    fn echo_id_service() -> impl Service<Request<Body>, Response = String, Error = Infallible> {
        RequestIdLayer.layer(tower::service_fn(|req: Request<Body>| async move {
            assert!(req.headers().contains_key(X_REQUEST_ID));
            Ok::<_, Infallible>(req.request_id().to_string())
        }))
    }

    #[tokio::test]
    async fn generates_an_id_when_absent() {
        let id = echo_id_service()
            .oneshot(Request::builder().body(Body::default()).unwrap())
            .await
            .unwrap();
        assert_ne!(id, "unknown");
        assert_eq!(id.len(), 36); // uuid v4, hyphenated
    }

    #[tokio::test]
    async fn preserves_an_inbound_id() {
        let id = echo_id_service()
            .oneshot(
                Request::builder()
                    .header(X_REQUEST_ID, "req-42")
                    .body(Body::default())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(id, "req-42");
    }
}
