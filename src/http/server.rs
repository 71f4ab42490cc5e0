//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID, CORS injection)
//! - Dispatch requests to the routing engine
//! - Forward requests to the matched upstream
//! - Hand WebSocket upgrades to the relay
//! - Map upstream failures to 502/504
//!
//! # Request lifecycle
//! ```text
//! ACCEPTED → ROUTED → (INTERCEPTED | FORWARDING) → CLOSED
//! ```
//! `INTERCEPTED` (preflight) terminates without touching the upstream.
//! `FORWARDING` ends via normal completion, client abort (the handler task
//! is cancelled, aborting the in-flight upstream call), or upstream failure.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, OptionalFromRequestParts, State, WebSocketUpgrade},
    http::{header, request::Parts, HeaderValue, Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{CorsConfig, ProxyConfig, TimeoutConfig};
use crate::http::request::{RequestIdLayer, X_REQUEST_ID};
use crate::http::response::{cors_middleware, preflight_response, strip_hop_by_hop};
use crate::http::websocket;
use crate::net::{ConnectionTracker, Listener};
use crate::observability::metrics;
use crate::resilience::{forward_with_deadline, UpstreamFailure};
use crate::routing::{RouteDecision, Router as ProxyRouter, UpstreamTarget};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub client: Client<HttpConnector, Body>,
    pub cors: Arc<CorsConfig>,
    pub timeouts: TimeoutConfig,
    pub websockets: ConnectionTracker,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    websockets: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let proxy_router = Arc::new(ProxyRouter::from_config(&config.routes, &config.upstreams));

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let websockets = ConnectionTracker::new();
        let state = AppState {
            router: proxy_router,
            client,
            cors: Arc::new(config.cors.clone()),
            timeouts: config.timeouts,
            websockets: websockets.clone(),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            websockets,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(middleware::from_fn_with_state(
                state.cors.clone(),
                cors_middleware,
            ))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns after the shutdown signal fires and in-flight work drains,
    /// bounded by the shutdown grace period. WebSocket relays outliving the
    /// grace period are abandoned to process exit.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut drain_rx = shutdown.resubscribe();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let serve = axum::serve(listener.into_inner(), app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .into_future();
        tokio::pin!(serve);

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        tokio::select! {
            result = &mut serve => result?,
            _ = drain_rx.recv() => {
                match tokio::time::timeout(grace, &mut serve).await {
                    Ok(result) => result?,
                    Err(_) => {
                        tracing::warn!(
                            active_websockets = self.websockets.active_count(),
                            "Connections still open after grace period, abandoning drain"
                        );
                    }
                }
            }
        }

        // Relay tasks run detached from the accept loop; give them the same
        // grace period before giving up on them.
        if self.websockets.active_count() > 0 {
            tracing::info!(
                active = self.websockets.active_count(),
                "Draining WebSocket relays"
            );
            if tokio::time::timeout(grace, self.websockets.wait_for_drain())
                .await
                .is_err()
            {
                tracing::warn!(
                    active = self.websockets.active_count(),
                    "WebSocket relays still open after grace period"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Newtype adapter so `Option<_>` works as a handler extractor on axum 0.8.
///
/// `WebSocketUpgrade` implements `FromRequestParts` but not
/// `OptionalFromRequestParts`, which axum 0.8 requires for `Option<T>`
/// extractors. This wrapper delegates to the inner extractor and maps any
/// rejection (e.g. a non-upgrade request) to `None`, matching the behavior of
/// a bare `Option<WebSocketUpgrade>`.
struct OptionalWs(WebSocketUpgrade);

impl<S> OptionalFromRequestParts<S> for OptionalWs
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match WebSocketUpgrade::from_request_parts(parts, state).await {
            Ok(ws) => Ok(Some(OptionalWs(ws))),
            Err(_) => Ok(None),
        }
    }
}

/// Main proxy handler.
/// Asks the routing engine for a decision, then intercepts, upgrades, or
/// forwards accordingly.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    ws: Option<OptionalWs>,
    req: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    match state.router.decide(&req) {
        RouteDecision::Preflight => {
            tracing::debug!(request_id = %request_id, path = %path, "Preflight intercepted");
            metrics::record_request(&method, 200, "preflight", start);
            preflight_response(&state.cors)
        }
        RouteDecision::NoMatch => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request(&method, 404, "none", start);
            (StatusCode::NOT_FOUND, "No matching route found").into_response()
        }
        RouteDecision::Forward(route) => {
            let route_name = route.name.clone();
            let target = Arc::clone(&route.target);

            if let Some(OptionalWs(ws)) = ws {
                let path_query = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let url = target.ws_url(path_query);
                tracing::debug!(
                    request_id = %request_id,
                    route = %route_name,
                    url = %url,
                    "WebSocket upgrade dispatched"
                );
                metrics::record_request(&method, 101, &route_name, start);
                websocket::proxy_upgrade(
                    ws,
                    url,
                    route_name,
                    state.timeouts,
                    state.websockets.clone(),
                )
            } else {
                forward_http(&state, &target, &route_name, req, client_addr, &request_id, start)
                    .await
            }
        }
    }
}

/// Forward a plain HTTP request to the target and stream the response back.
async fn forward_http(
    state: &AppState,
    target: &UpstreamTarget,
    route_name: &str,
    mut req: Request<Body>,
    client_addr: SocketAddr,
    request_id: &str,
    start: Instant,
) -> Response {
    let method = req.method().as_str().to_string();
    let path_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let uri_string = target.http_uri(path_query);
    *req.uri_mut() = match Uri::try_from(uri_string.as_str()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, uri = %uri_string, error = %e, "Invalid upstream URI");
            metrics::record_request(&method, 500, route_name, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream URI").into_response();
        }
    };

    strip_hop_by_hop(req.headers_mut());

    let headers = req.headers_mut();
    // Host names the upstream; the original stays in X-Forwarded-Host.
    if let Some(original_host) = headers.get(header::HOST).cloned() {
        headers.insert("x-forwarded-host", original_host);
    }
    if let Ok(host) = HeaderValue::from_str(target.authority()) {
        headers.insert(header::HOST, host);
    }
    headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
    let client_ip = client_addr.ip().to_string();
    let forwarded_for = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, client_ip),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert("x-forwarded-for", value);
    }

    let deadline = Duration::from_secs(state.timeouts.request_secs);
    match forward_with_deadline(&state.client, req, deadline).await {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(
                request_id = %request_id,
                route = %route_name,
                status = %status,
                "Upstream responded"
            );
            metrics::record_request(&method, status.as_u16(), route_name, start);

            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(failure @ UpstreamFailure::TimedOut(_)) => {
            tracing::error!(
                request_id = %request_id,
                route = %route_name,
                upstream = %target.authority(),
                error = %failure,
                "Upstream timed out"
            );
            metrics::record_upstream_error("timeout", &target.name);
            metrics::record_request(&method, 504, route_name, start);
            (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response()
        }
        Err(failure) => {
            tracing::error!(
                request_id = %request_id,
                route = %route_name,
                upstream = %target.authority(),
                error = %failure,
                "Upstream request failed"
            );
            metrics::record_upstream_error("unreachable", &target.name);
            metrics::record_request(&method, 502, route_name, start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
