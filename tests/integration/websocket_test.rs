// tests/integration/websocket_test.rs

//! End-to-end tests against a local WebSocket server.

use super::test_helpers::{TEST_LOGIN, TEST_PASSWORD, init_tracing};
use ecomet_client::client::{ConnectionPhase, connect};
use ecomet_client::config::Config;
use ecomet_client::core::{ClientError, LoginState};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

type ServerStream = WebSocketStream<TcpStream>;

/// Accepts a single WebSocket connection and hands it to `handler`.
/// Returns the URL the client should connect to.
async fn spawn_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{addr}/websocket")
}

fn config_for(url: String) -> Config {
    init_tracing();
    Config {
        url,
        login: TEST_LOGIN.to_string(),
        password: TEST_PASSWORD.to_string(),
        connect_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

async fn next_text(ws: &mut ServerStream) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text.to_string(),
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Keeps the connection driven (so close frames are answered) until it ends.
async fn drain(ws: &mut ServerStream) {
    while let Some(Ok(_)) = ws.next().await {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_and_query_over_websocket() {
    let (login_tx, login_rx) = oneshot::channel();
    let (query_tx, query_rx) = oneshot::channel();
    let url = spawn_server(|mut ws| async move {
        let login = next_text(&mut ws).await;
        let _ = login_tx.send(login);
        ws.send(Message::Text(r#"{"id": 1, "type": "ok"}"#.into()))
            .await
            .unwrap();
        let query = next_text(&mut ws).await;
        let _ = query_tx.send(query);
        drain(&mut ws).await;
    })
    .await;

    let handle = connect(&config_for(url)).await.unwrap();
    let client = Arc::clone(handle.client());
    assert!(client.wait_for_login_async(Duration::from_secs(5)).await);
    assert_eq!(client.login_state(), LoginState::LoggedIn);

    let login = login_rx.await.unwrap();
    assert_eq!(
        login,
        r#"{"id": 1, "action": "login", "params": {"login": "guest","pass": "guest"}}"#
    );

    let id = client.submit_query("GET .name").unwrap();
    assert_eq!(id, 2);
    let query = query_rx.await.unwrap();
    assert_eq!(
        query,
        r#"{"id": 2, "action": "query", "params": {"query_string": "GET .name"}}"#
    );

    handle.close().await;
    assert!(matches!(
        client.phase(),
        ConnectionPhase::Closed { remote: false, .. }
    ));
    assert!(!client.is_connected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_rejected_over_websocket() {
    let url = spawn_server(|mut ws| async move {
        next_text(&mut ws).await;
        ws.send(Message::Text(r#"{"id": 1, "type": "error"}"#.into()))
            .await
            .unwrap();
        drain(&mut ws).await;
    })
    .await;

    let handle = connect(&config_for(url)).await.unwrap();
    let client = Arc::clone(handle.client());
    assert!(!client.wait_for_login_async(Duration::from_secs(5)).await);
    assert_eq!(client.login_state(), LoginState::LoginFailed);
    handle.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_close_is_reported_as_remote() {
    let url = spawn_server(|mut ws| async move {
        next_text(&mut ws).await;
        ws.send(Message::Text(r#"{"id": 1, "type": "ok"}"#.into()))
            .await
            .unwrap();
        let frame = CloseFrame {
            code: CloseCode::Away,
            reason: "server going down".into(),
        };
        ws.send(Message::Close(Some(frame))).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let mut handle = connect(&config_for(url)).await.unwrap();
    let client = Arc::clone(handle.client());
    assert!(client.wait_for_login_async(Duration::from_secs(5)).await);

    tokio::time::timeout(Duration::from_secs(5), handle.closed())
        .await
        .expect("connection was not closed by the server");

    assert_eq!(
        client.phase(),
        ConnectionPhase::Closed {
            code: 1001,
            reason: "server going down".to_string(),
            remote: true,
        }
    );
    assert_eq!(
        client.submit_query("GET .name").unwrap_err(),
        ClientError::TransportClosed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unanswered_login_times_out() {
    let url = spawn_server(|mut ws| async move {
        drain(&mut ws).await;
    })
    .await;

    let handle = connect(&config_for(url)).await.unwrap();
    let client = Arc::clone(handle.client());
    assert!(!client.wait_for_login_async(Duration::from_millis(200)).await);
    assert_eq!(client.login_state(), LoginState::AwaitingLogin);
    handle.close().await;
}

#[tokio::test]
async fn test_connect_rejects_non_websocket_scheme() {
    let config = config_for("http://127.0.0.1:1/websocket".to_string());
    match connect(&config).await {
        Err(ClientError::InvalidEndpoint(message)) => assert!(message.contains("scheme")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connected to a non-websocket endpoint"),
    }
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = config_for(format!("ws://{addr}/websocket"));
    assert!(connect(&config).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_closed_wait_can_be_resumed() {
    let url = spawn_server(|mut ws| async move {
        drain(&mut ws).await;
    })
    .await;

    let mut handle = connect(&config_for(url)).await.unwrap();
    let client = Arc::clone(handle.client());

    assert!(
        tokio::time::timeout(Duration::from_millis(50), handle.closed())
            .await
            .is_err()
    );
    // The connection is still open, so a second wait must block as well.
    assert!(
        tokio::time::timeout(Duration::from_millis(300), handle.closed())
            .await
            .is_err()
    );
    assert_eq!(client.phase(), ConnectionPhase::Established);

    handle.close().await;
    assert!(matches!(
        client.phase(),
        ConnectionPhase::Closed { remote: false, .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_handle_reports_local_close() {
    let url = spawn_server(|mut ws| async move {
        drain(&mut ws).await;
    })
    .await;

    let handle = connect(&config_for(url)).await.unwrap();
    let client = Arc::clone(handle.client());
    drop(handle);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while client.phase() == ConnectionPhase::Established {
        assert!(tokio::time::Instant::now() < deadline, "reader never stopped");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(matches!(
        client.phase(),
        ConnectionPhase::Closed { remote: false, .. }
    ));
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let mut config = config_for("ws://127.0.0.1:1/websocket".to_string());
    config.registry.purge_interval = Duration::ZERO;
    match connect(&config).await {
        Err(ClientError::InvalidConfig(message)) => {
            assert!(message.contains("purge_interval"), "{message}")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connected with an invalid configuration"),
    }
}
