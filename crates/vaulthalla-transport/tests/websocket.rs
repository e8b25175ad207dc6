//! WebSocket transport against a local tungstenite server.

#![cfg(feature = "websocket")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use vaulthalla_transport::{Connector, Transport, TransportError, WebSocketConnector};

/// Accept one connection, then run `script` against it.
async fn serve_once<F, Fut>(script: F) -> String
where
    F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        script(ws).await;
    });
    format!("ws://{addr}")
}

#[tokio::test]
async fn text_frames_round_trip() {
    let url = serve_once(|mut ws| async move {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                ws.send(Message::Text(format!("echo:{text}"))).await.unwrap();
            }
        }
    })
    .await;

    let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
    transport.send(r#"{"command":"auth.me"}"#.to_owned()).await.unwrap();

    let reply = transport.recv().await.unwrap().unwrap();
    assert_eq!(reply, r#"echo:{"command":"auth.me"}"#);
    transport.close().await.unwrap();
}

#[tokio::test]
async fn utf8_binary_frames_are_delivered_as_text() {
    let url = serve_once(|mut ws| async move {
        ws.send(Message::Binary(b"{\"status\":\"ok\"}".to_vec()))
            .await
            .unwrap();
        ws.send(Message::Binary(vec![0xff, 0xfe])).await.unwrap();
        let _ = ws.next().await;
    })
    .await;

    let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
    assert_eq!(transport.recv().await.unwrap().unwrap(), r#"{"status":"ok"}"#);
    assert!(matches!(
        transport.recv().await,
        Some(Err(TransportError::Receive { .. }))
    ));
}

#[tokio::test]
async fn server_close_ends_stream() {
    let url = serve_once(|mut ws| async move {
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
    })
    .await;

    let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
    assert!(transport.recv().await.is_none());
    // Already closed by the server; closing again is a no-op.
    transport.close().await.unwrap();
}

#[tokio::test]
async fn client_close_reaches_server() {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let url = serve_once(|mut ws| async move {
        let mut saw_close = false;
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                saw_close = true;
            }
        }
        let _ = tx.send(saw_close);
    })
    .await;

    let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
    transport.close().await.unwrap();
    transport.close().await.unwrap();
    assert!(rx.await.unwrap());
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = WebSocketConnector::new().connect(&url).await.err().unwrap();
    match err {
        TransportError::Connect { url: failed, .. } => assert_eq!(failed, url),
        other => panic!("expected connect error, got {other}"),
    }
}
