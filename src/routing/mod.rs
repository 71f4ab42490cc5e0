//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host, path)
//!     → router.rs (preflight interception, route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: Preflight | Forward(route) | NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[] + UpstreamConfig[]
//!     → Resolve upstream targets
//!     → Sort by priority, then prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{CompiledRoute, RouteDecision, Router, UpstreamTarget};
