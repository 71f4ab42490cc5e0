//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce connect/response deadline)
//!     → On failure: classify (timeout vs transport)
//!     → HTTP layer maps the class to 504 or 502
//! ```
//!
//! # Design Decisions
//! - Failures are surfaced immediately, never retried: the proxy is a
//!   transparent transport, not an application-level client
//! - Per-request failures stay isolated to their connection

pub mod timeouts;

pub use timeouts::{forward_with_deadline, UpstreamFailure};
