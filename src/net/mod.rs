//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept via the HTTP server)
//!     → connection.rs (identity, relay lifecycle tracking)
//!     → Hand off to HTTP layer
//!
//! Connection states:
//!     Accepted → Routed → (Intercepted | Forwarding) → Closed
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
