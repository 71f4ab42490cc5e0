//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config file still
//! yields a runnable proxy: listen on 8080, forward everything to
//! `http://localhost:3007`, inject permissive CORS headers.

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
///
/// Constructed once at startup, validated, then shared immutably. Nothing
/// mutates it after initialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream server definitions.
    pub upstreams: Vec<UpstreamConfig>,

    /// Route definitions mapping requests to upstreams.
    pub routes: Vec<RouteConfig>,

    /// CORS response policy.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstreams: vec![UpstreamConfig::default()],
            routes: vec![RouteConfig::default()],
            cors: CorsConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A single upstream server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Unique upstream identifier, referenced by routes.
    pub name: String,

    /// Base URL of the upstream (e.g., "http://localhost:3007").
    /// The scheme decides the WebSocket scheme too (http → ws, https → wss).
    pub url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            url: "http://localhost:3007".to_string(),
        }
    }
}

/// Route configuration mapping requests to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match, case-insensitive). Optional.
    pub host: Option<String>,

    /// Path prefix to match. Longest prefix is preferred across routes.
    pub path_prefix: String,

    /// Upstream name to forward to.
    pub upstream: String,

    /// Route priority (higher = checked first, before prefix length).
    pub priority: u32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            host: None,
            path_prefix: "/".to_string(),
            upstream: "app".to_string(),
            priority: 0,
        }
    }
}

/// CORS response policy.
///
/// Injected on every response leaving the proxy, and used to answer
/// preflight `OPTIONS` requests without contacting the upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value for `Access-Control-Allow-Origin`. Ignored when
    /// `allow_credentials` is set: a wildcard origin is invalid for
    /// credentialed requests, so the requesting origin is echoed instead.
    pub allow_origin: String,

    /// Value for `Access-Control-Allow-Methods`.
    pub allow_methods: String,

    /// Value for `Access-Control-Allow-Headers`.
    pub allow_headers: String,

    /// Emit `Access-Control-Allow-Credentials: true` and echo the request
    /// origin rather than emitting `allow_origin`.
    pub allow_credentials: bool,

    /// Value for `Access-Control-Max-Age` on preflight responses, seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
            allow_credentials: false,
            max_age_secs: 86_400,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream response deadline (time to response headers) in seconds.
    pub request_secs: u64,

    /// WebSocket relay idle timeout in seconds. Inactivity in a direction
    /// beyond this closes the relay.
    pub idle_secs: u64,

    /// Grace period for draining WebSocket relays on shutdown, seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 60,
            shutdown_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
