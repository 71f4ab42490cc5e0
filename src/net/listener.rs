//! TCP listener setup.
//!
//! # Responsibilities
//! - Parse and bind the configured address
//! - Fail fast on configuration errors (bad address, port in use)
//! - Log bind success with the effective address

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
}

/// The proxy's bound listening socket.
///
/// Both plain HTTP requests and WebSocket upgrade handshakes arrive here;
/// protocol detection happens later, in the HTTP layer.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to the configured address.
    ///
    /// A port already in use is a fatal configuration error; the caller is
    /// expected to exit non-zero rather than retry.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr =
            config
                .bind_address
                .parse()
                .map_err(|source| ListenerError::InvalidAddress {
                    address: config.bind_address.clone(),
                    source,
                })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                address: addr,
                source,
            })?;

        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: addr,
            source,
        })?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner: listener })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Hand the socket to the HTTP server's accept loop.
    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}
