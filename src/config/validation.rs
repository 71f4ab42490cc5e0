//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing upstreams)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: `ProxyConfig → Result<(), Vec<ValidationError>>`
//! - Runs before the config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic defect in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("no upstreams configured")]
    NoUpstreams,

    #[error("duplicate upstream name '{0}'")]
    DuplicateUpstream(String),

    #[error("upstream '{name}' has invalid url '{url}': {reason}")]
    InvalidUpstreamUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("route '{route}' references unknown upstream '{upstream}'")]
    UnknownUpstream { route: String, upstream: String },

    #[error("route '{route}' has path prefix '{prefix}' not starting with '/'")]
    InvalidPathPrefix { route: String, prefix: String },

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("cors allow_origin must not be empty")]
    EmptyAllowOrigin,
}

/// Validate a deserialized configuration, collecting every defect.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }

    let mut upstream_names = HashSet::new();
    for upstream in &config.upstreams {
        if !upstream_names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
        match Url::parse(&upstream.url) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    errors.push(ValidationError::InvalidUpstreamUrl {
                        name: upstream.name.clone(),
                        url: upstream.url.clone(),
                        reason: format!("unsupported scheme '{}'", url.scheme()),
                    });
                } else if url.host_str().is_none() {
                    errors.push(ValidationError::InvalidUpstreamUrl {
                        name: upstream.name.clone(),
                        url: upstream.url.clone(),
                        reason: "missing host".to_string(),
                    });
                }
            }
            Err(e) => {
                errors.push(ValidationError::InvalidUpstreamUrl {
                    name: upstream.name.clone(),
                    url: upstream.url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut route_names = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPathPrefix {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }
        if !upstream_names.contains(route.upstream.as_str()) {
            errors.push(ValidationError::UnknownUpstream {
                route: route.name.clone(),
                upstream: route.upstream.clone(),
            });
        }
    }

    for (value, name) in [
        (config.timeouts.connect_secs, "connect_secs"),
        (config.timeouts.request_secs, "request_secs"),
        (config.timeouts.idle_secs, "idle_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if config.cors.allow_origin.is_empty() {
        errors.push(ValidationError::EmptyAllowOrigin);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
