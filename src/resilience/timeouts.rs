//! Timeout enforcement for upstream calls.
//!
//! # Responsibilities
//! - Wrap the upstream request with the response deadline
//! - Distinguish timeout failures from transport failures, so the HTTP
//!   layer can map them to 504 and 502 respectively
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - The connect timeout lives on the `HttpConnector`; this module owns
//!   the response-header deadline
//! - No retries: failures surface immediately, this is a transparent
//!   transport-level proxy

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper::body::Incoming;
use hyper::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;

/// Why an upstream call produced no response.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    /// No response headers within the deadline → 504.
    #[error("upstream did not respond within {0:?}")]
    TimedOut(Duration),

    /// Connection refused, reset, or other transport error → 502.
    #[error("upstream unreachable: {0}")]
    Unreachable(#[from] hyper_util::client::legacy::Error),
}

/// Execute an upstream request under the response deadline.
///
/// The deadline covers connection establishment (already bounded by the
/// connector's connect timeout) and the wait for response headers. Body
/// streaming after the headers is not subject to this deadline.
pub async fn forward_with_deadline(
    client: &Client<HttpConnector, Body>,
    req: Request<Body>,
    deadline: Duration,
) -> Result<Response<Incoming>, UpstreamFailure> {
    match tokio::time::timeout(deadline, client.request(req)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(UpstreamFailure::Unreachable(e)),
        Err(_) => Err(UpstreamFailure::TimedOut(deadline)),
    }
}
