//! Integration tests for the WebSocket relay.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

mod common;

use common::{single_upstream_config, spawn_proxy, start_ws_echo_backend};

#[tokio::test]
async fn relays_messages_unmodified_and_in_order() {
    let (backend_addr, _closed) = start_ws_echo_backend().await;
    let (proxy_addr, shutdown) = spawn_proxy(single_upstream_config(backend_addr)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/chat", proxy_addr))
        .await
        .expect("upgrade through proxy failed");

    let payloads = ["one", "two", "three"];
    for payload in payloads {
        ws.send(Message::Text(payload.into())).await.unwrap();
    }
    ws.send(Message::Binary(vec![0u8, 1, 2, 254, 255].into()))
        .await
        .unwrap();

    for payload in payloads {
        let echoed = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("echo timed out")
            .unwrap()
            .unwrap();
        assert_eq!(echoed, Message::Text(payload.into()));
    }
    let echoed = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("echo timed out")
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Message::Binary(vec![0u8, 1, 2, 254, 255].into()));

    let _ = ws.close(None).await;
    shutdown.trigger();
}

#[tokio::test]
async fn client_close_propagates_to_the_upstream() {
    let (backend_addr, mut closed) = start_ws_echo_backend().await;
    let (proxy_addr, shutdown) = spawn_proxy(single_upstream_config(backend_addr)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/chat", proxy_addr))
        .await
        .unwrap();

    ws.send(Message::Text("ping".into())).await.unwrap();
    let echoed = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Message::Text("ping".into()));

    ws.close(None).await.unwrap();

    // The upstream side must observe the close within the grace period.
    tokio::time::timeout(Duration::from_secs(5), closed.recv())
        .await
        .expect("upstream socket still open after client close")
        .expect("backend task ended without notifying");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_ws_upstream_closes_the_client() {
    // Nothing listens on the configured upstream port.
    let mut config = single_upstream_config("127.0.0.1:9".parse().unwrap());
    config.timeouts.connect_secs = 2;
    let (proxy_addr, shutdown) = spawn_proxy(config).await;

    // The client-side handshake completes; the connection must then close
    // promptly once the upstream dial fails.
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/chat", proxy_addr))
        .await
        .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("connection not closed after upstream dial failure");
    match outcome {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {}
        Some(Ok(other)) => panic!("expected close, got {:?}", other),
    }

    shutdown.trigger();
}
