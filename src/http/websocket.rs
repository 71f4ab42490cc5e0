//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Dial the upstream WebSocket under the connect timeout
//! - Bidirectional message forwarding
//!
//! # Data Flow
//! ```text
//! Client ←── WebSocket frames ──→ Proxy ←── WebSocket frames ──→ Upstream
//! ```
//!
//! # Design Decisions
//! - Message-level forwarding (no buffering beyond one message)
//! - Either side closing or erroring ends the relay; dropping the relay
//!   closes both sockets, so close propagates within the grace period
//! - Inactivity in a direction beyond the idle timeout ends the relay
//! - Payloads pass through unmodified and in order per direction

use std::time::Duration;

use axum::extract::ws::{Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use crate::config::TimeoutConfig;
use crate::net::ConnectionTracker;
use crate::observability::metrics;

/// Accept the client upgrade and spawn the relay task.
pub fn proxy_upgrade(
    ws: WebSocketUpgrade,
    target_url: String,
    route: String,
    timeouts: TimeoutConfig,
    tracker: ConnectionTracker,
) -> Response {
    ws.on_upgrade(move |client| relay(client, target_url, route, timeouts, tracker))
}

/// Relay messages between the client socket and a freshly dialed upstream.
async fn relay(
    client: WebSocket,
    target_url: String,
    route: String,
    timeouts: TimeoutConfig,
    tracker: ConnectionTracker,
) {
    let guard = tracker.track();
    let connection_id = guard.id();
    metrics::record_active_websockets(tracker.active_count());

    let connect = Duration::from_secs(timeouts.connect_secs);
    let upstream = match tokio::time::timeout(
        connect,
        tokio_tungstenite::connect_async(target_url.as_str()),
    )
    .await
    {
        Ok(Ok((upstream, _response))) => upstream,
        Ok(Err(e)) => {
            tracing::error!(
                %connection_id,
                route = %route,
                url = %target_url,
                error = %e,
                "WebSocket upstream connection failed"
            );
            drop(guard);
            metrics::record_active_websockets(tracker.active_count());
            return;
        }
        Err(_) => {
            tracing::error!(
                %connection_id,
                route = %route,
                url = %target_url,
                "WebSocket upstream connect timed out"
            );
            drop(guard);
            metrics::record_active_websockets(tracker.active_count());
            return;
        }
    };

    tracing::debug!(%connection_id, route = %route, url = %target_url, "WebSocket relay established");

    let idle = Duration::from_secs(timeouts.idle_secs);
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    // Relay: client → upstream
    let client_to_upstream = async {
        loop {
            let message = match tokio::time::timeout(idle, client_rx.next()).await {
                Ok(Some(Ok(message))) => message,
                // Stream end, protocol error, or idle timeout all end the relay.
                Ok(Some(Err(_))) | Ok(None) | Err(_) => break,
            };
            let Some(message) = client_to_upstream_message(message) else {
                break;
            };
            if upstream_tx.send(message).await.is_err() {
                break;
            }
        }
    };

    // Relay: upstream → client
    let upstream_to_client = async {
        loop {
            let message = match tokio::time::timeout(idle, upstream_rx.next()).await {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(_))) | Ok(None) | Err(_) => break,
            };
            let Some(message) = upstream_to_client_message(message) else {
                break;
            };
            if client_tx.send(message).await.is_err() {
                break;
            }
        }
    };

    // When one direction ends, the select drops the other; dropping both
    // halves closes both sockets.
    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }

    drop(guard);
    metrics::record_active_websockets(tracker.active_count());
    tracing::debug!(%connection_id, route = %route, "WebSocket relay closed");
}

/// Convert a client-side message for the upstream leg.
/// `None` ends the relay (close frame).
fn client_to_upstream_message(message: ClientMessage) -> Option<UpstreamMessage> {
    match message {
        ClientMessage::Text(text) => Some(UpstreamMessage::Text(text.as_str().into())),
        ClientMessage::Binary(data) => Some(UpstreamMessage::Binary(data)),
        ClientMessage::Ping(data) => Some(UpstreamMessage::Ping(data)),
        ClientMessage::Pong(data) => Some(UpstreamMessage::Pong(data)),
        ClientMessage::Close(_) => None,
    }
}

/// Convert an upstream message for the client leg.
/// `None` ends the relay (close frame; raw frames never surface from a read).
fn upstream_to_client_message(message: UpstreamMessage) -> Option<ClientMessage> {
    match message {
        UpstreamMessage::Text(text) => Some(ClientMessage::Text(text.as_str().into())),
        UpstreamMessage::Binary(data) => Some(ClientMessage::Binary(data)),
        UpstreamMessage::Ping(data) => Some(ClientMessage::Ping(data)),
        UpstreamMessage::Pong(data) => Some(ClientMessage::Pong(data)),
        UpstreamMessage::Close(_) | UpstreamMessage::Frame(_) => None,
    }
}
