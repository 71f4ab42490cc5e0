//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routing dispatch, forwarding)
//!     → request.rs (request ID layer)
//!     → [routing layer decides: preflight | forward | no match]
//!     → websocket.rs (upgrade relay) or upstream HTTP call
//!     → response.rs (CORS injection, hop-by-hop stripping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
