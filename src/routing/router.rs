//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile route configs and upstream targets at startup
//! - Intercept CORS preflight (`OPTIONS`) before any forwarding
//! - Look up the matching route for a request
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes ordered by priority, then prefix length (longest preferred);
//!   first match wins
//! - Every `OPTIONS` request is answered synthetically and never forwarded
//! - Explicit `NoMatch` rather than a silent default; the caller turns it
//!   into a deterministic 404

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use url::Url;

use crate::config::{RouteConfig, UpstreamConfig};
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

/// A resolved upstream target: scheme plus authority, precomputed from the
/// configured URL so the hot path only does string formatting.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    /// Upstream name, for logging and metrics.
    pub name: String,
    scheme: String,
    authority: String,
}

impl UpstreamTarget {
    fn from_config(config: &UpstreamConfig) -> Option<Self> {
        let url = match Url::parse(&config.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(upstream = %config.name, url = %config.url, error = %e, "Invalid upstream url");
                return None;
            }
        };
        let host = url.host_str()?.to_string();
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        Some(Self {
            name: config.name.clone(),
            scheme: url.scheme().to_string(),
            authority,
        })
    }

    /// The `host[:port]` the upstream is addressed by. Also the value the
    /// forwarded `Host` header is rewritten to.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Absolute HTTP URI for a request with the given path-and-query.
    pub fn http_uri(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme, self.authority, path_and_query)
    }

    /// WebSocket URL for an upgrade with the given path-and-query.
    /// `http` upstreams are dialed as `ws`, `https` as `wss`.
    pub fn ws_url(&self, path_and_query: &str) -> String {
        let scheme = if self.scheme == "https" { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.authority, path_and_query)
    }
}

/// A compiled route: match conditions plus the resolved target.
#[derive(Debug)]
pub struct CompiledRoute {
    /// Route name, for logging and metrics.
    pub name: String,
    /// Resolved upstream target.
    pub target: Arc<UpstreamTarget>,
    matcher: AndMatcher,
    priority: u32,
    prefix_len: usize,
}

/// Routing decision for one inbound request.
#[derive(Debug)]
pub enum RouteDecision<'a> {
    /// CORS preflight: answer synthetically, never contact the upstream.
    Preflight,
    /// Forward to the matched route's upstream.
    Forward(&'a CompiledRoute),
    /// No route matched.
    NoMatch,
}

/// Immutable compiled route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Compile routes and upstreams into an immutable table.
    ///
    /// Entries referencing unresolvable upstreams are skipped with a
    /// warning; validation normally rejects such configs before this runs.
    pub fn from_config(routes: &[RouteConfig], upstreams: &[UpstreamConfig]) -> Self {
        let targets: HashMap<&str, Arc<UpstreamTarget>> = upstreams
            .iter()
            .filter_map(|u| UpstreamTarget::from_config(u).map(|t| (u.name.as_str(), Arc::new(t))))
            .collect();

        let mut compiled: Vec<CompiledRoute> = routes
            .iter()
            .filter_map(|route| {
                let target = match targets.get(route.upstream.as_str()) {
                    Some(target) => Arc::clone(target),
                    None => {
                        tracing::warn!(
                            route = %route.name,
                            upstream = %route.upstream,
                            "Route references unknown upstream, skipping"
                        );
                        return None;
                    }
                };

                let prefix = PathPrefixMatcher::new(route.path_prefix.clone());
                let prefix_len = prefix.len();
                let mut matchers: Vec<Box<dyn Matcher>> = vec![Box::new(prefix)];
                if let Some(host) = &route.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }

                Some(CompiledRoute {
                    name: route.name.clone(),
                    target,
                    matcher: AndMatcher::new(matchers),
                    priority: route.priority,
                    prefix_len,
                })
            })
            .collect();

        // Priority first, then longest prefix. Stable sort keeps config
        // order for ties, so first-match-wins stays deterministic.
        compiled.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.prefix_len.cmp(&a.prefix_len))
        });

        Self { routes: compiled }
    }

    /// Decide what to do with an inbound request.
    pub fn decide(&self, req: &Request<Body>) -> RouteDecision<'_> {
        if req.method() == Method::OPTIONS {
            return RouteDecision::Preflight;
        }

        self.routes
            .iter()
            .find(|route| route.matcher.matches(req))
            .map(RouteDecision::Forward)
            .unwrap_or(RouteDecision::NoMatch)
    }

    /// Number of compiled routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes compiled.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
