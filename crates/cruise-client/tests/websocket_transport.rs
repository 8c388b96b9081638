//! Integration tests for the WebSocket transport.
//!
//! Each test binds a throwaway controller on `127.0.0.1:0` with
//! `tokio_tungstenite::accept_async`, then drives a real
//! `ConnectionManager` + `WebSocketTransportFactory` against it.  The fake
//! controller decodes every text frame it receives with `cruise_core`, so the
//! assertions read in protocol terms rather than raw strings.

use std::sync::Arc;
use std::time::Duration;

use cruise_client::application::connection_manager::{ConnectionManager, ManagerConfig};
use cruise_client::application::event_bus::InboundMessage;
use cruise_client::application::session::{SessionError, SessionState};
use cruise_client::infrastructure::transport::{WebSocketSettings, WebSocketTransportFactory};
use cruise_core::{decode_frame, Axis, Command, CommandValue, Frame};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use url::Url;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn settings() -> WebSocketSettings {
    WebSocketSettings {
        connect_timeout: Duration::from_secs(2),
        close_timeout: Duration::from_millis(500),
    }
}

fn manager_for(endpoint: Url) -> ConnectionManager {
    let factory = Arc::new(WebSocketTransportFactory::new(settings()));
    ConnectionManager::new(factory, ManagerConfig::new(endpoint))
}

/// Accepts one client and collects its text frames until the socket closes.
/// `greeting`, if set, is pushed to the client right after `"start"`.
async fn spawn_controller(greeting: Option<&'static str>) -> (Url, JoinHandle<Vec<Frame>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = Url::parse(&format!("ws://{addr}")).unwrap();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let mut frames = Vec::new();
        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let frame = decode_frame(&text).unwrap();
                    if frame == Frame::Start {
                        if let Some(greeting) = greeting {
                            ws.send(Message::Text(greeting.to_string())).await.unwrap();
                        }
                    }
                    frames.push(frame);
                }
                // Keep polling so tungstenite flushes the close reply.
                Ok(_) => {}
                Err(_) => break,
            }
        }
        frames
    });
    (endpoint, handle)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_controller_sees_start_command_stop_in_order() {
    // Arrange
    let (endpoint, controller) = spawn_controller(None).await;
    let manager = manager_for(endpoint);

    // Act
    timeout(TEST_TIMEOUT, manager.connect())
        .await
        .unwrap()
        .expect("connect succeeds");
    manager.angle(0.753).unwrap();
    timeout(TEST_TIMEOUT, manager.disconnect())
        .await
        .unwrap()
        .expect("disconnect succeeds");

    // Assert
    assert_eq!(manager.state(), SessionState::Disconnected);
    let frames = timeout(TEST_TIMEOUT, controller).await.unwrap().unwrap();
    assert_eq!(
        frames,
        vec![
            Frame::Start,
            Frame::Command(Command::new(
                Axis::Angle,
                CommandValue::from_hundredths(75).unwrap()
            )),
            Frame::Stop,
        ]
    );
}

#[tokio::test]
async fn test_controller_text_is_published_to_subscribers() {
    // Arrange
    let (endpoint, controller) = spawn_controller(Some("battery: 87")).await;
    let manager = manager_for(endpoint);
    let mut inbound = manager.subscribe_inbound();

    // Act
    timeout(TEST_TIMEOUT, manager.connect())
        .await
        .unwrap()
        .unwrap();
    let received = timeout(TEST_TIMEOUT, inbound.recv()).await.unwrap().unwrap();

    // Assert
    assert_eq!(received, InboundMessage::Text("battery: 87".to_string()));

    timeout(TEST_TIMEOUT, manager.disconnect())
        .await
        .unwrap()
        .unwrap();
    timeout(TEST_TIMEOUT, controller).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unreachable_controller_fails_the_connect() {
    // Arrange: bind then drop so the port is known to be closed
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let manager = manager_for(Url::parse(&format!("ws://{addr}")).unwrap());

    // Act
    let result = timeout(TEST_TIMEOUT, manager.connect()).await.unwrap();

    // Assert
    assert!(matches!(result, Err(SessionError::TransportOpen { .. })));
    assert_eq!(manager.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_controller_dropping_the_socket_fails_the_session() {
    // Arrange: a controller that hangs up after the handshake
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let controller = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        // Wait for "start", then close from the controller side.
        let _ = ws.next().await;
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
    });
    let manager = manager_for(Url::parse(&format!("ws://{addr}")).unwrap());
    let mut states = manager.subscribe_state();

    // Act
    timeout(TEST_TIMEOUT, manager.connect())
        .await
        .unwrap()
        .unwrap();
    timeout(TEST_TIMEOUT, states.wait_for(|s| *s == SessionState::Failed))
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert_eq!(
        manager.speed(0.2),
        Err(SessionError::NotConnected(SessionState::Failed))
    );
    controller.await.unwrap();
}
