//! CORS-injecting reverse proxy library.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────┐
//!                        │                CORS PROXY                   │
//!                        │                                             │
//!   Client Request       │  ┌─────────┐   ┌─────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│   net   │──▶│  http   │──▶│ routing  │  │
//!                        │  │listener │   │ server  │   │  engine  │  │
//!                        │  └─────────┘   └─────────┘   └────┬─────┘  │
//!                        │                                   │        │
//!                        │              OPTIONS? ◀───────────┤        │
//!                        │              synthetic 200        ▼        │
//!   Client Response      │  ┌─────────┐   ┌──────────────────────┐    │
//!   ◀────────────────────┼──│response │◀──│ forwarder (HTTP/WS)  │◀───┼── Upstream
//!                        │  │  CORS   │   └──────────────────────┘    │
//!                        │  └─────────┘                               │
//!                        │  ┌───────────────────────────────────────┐ │
//!                        │  │         Cross-Cutting Concerns        │ │
//!                        │  │  config  lifecycle  observability     │ │
//!                        │  │          resilience (timeouts)        │ │
//!                        │  └───────────────────────────────────────┘ │
//!                        └────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use net::Listener;
