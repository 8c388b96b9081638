//! Integration tests for the HTTP transport.
//!
//! A minimal responder on `127.0.0.1:0` reads one request head per
//! connection, records its request line, and answers with a fixed status.
//! That is enough to check the routes the client hits and how it reports
//! non-2xx answers, without pulling in a server framework.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cruise_client::application::transport::{Transport, TransportError, TransportEvent};
use cruise_client::infrastructure::transport::{HttpControlClient, HttpTransport, NudgeSender};
use cruise_core::Nudge;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use url::Url;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

type RequestLog = Arc<Mutex<Vec<String>>>;

/// A client that never routes loopback traffic through an environment proxy.
fn client(base: Url) -> HttpControlClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpControlClient::with_client(http, base)
}

/// Serves every connection with `status_line`, logging each request line.
async fn spawn_responder(status_line: &'static str) -> (Url, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    let log: RequestLog = Arc::default();

    let seen = log.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut tcp, _)) = listener.accept().await else {
                return;
            };
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tcp.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let text = String::from_utf8_lossy(&head);
                if let Some(line) = text.lines().next() {
                    seen.lock().unwrap().push(line.to_string());
                }
                let response =
                    format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = tcp.write_all(response.as_bytes()).await;
                let _ = tcp.shutdown().await;
            });
        }
    });
    (base, log)
}

// ── HttpControlClient ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_left_and_right_post_to_their_routes() {
    // Arrange
    let (base, log) = spawn_responder("204 No Content").await;
    let client = client(base);

    // Act
    timeout(TEST_TIMEOUT, client.left()).await.unwrap().unwrap();
    timeout(TEST_TIMEOUT, client.nudge(Nudge::Right))
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert_eq!(
        *log.lock().unwrap(),
        vec!["POST /left HTTP/1.1", "POST /right HTTP/1.1"]
    );
}

#[tokio::test]
async fn test_server_error_is_reported_with_its_status() {
    let (base, _log) = spawn_responder("500 Internal Server Error").await;
    let client = client(base);

    let result = timeout(TEST_TIMEOUT, client.right()).await.unwrap();

    assert_eq!(
        result,
        Err(TransportError::Status {
            route: "right".to_string(),
            status: 500,
        })
    );
}

#[tokio::test]
async fn test_refused_connection_is_a_request_error() {
    // Arrange: bind then drop so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    drop(listener);
    let client = client(base);

    // Act
    let result = timeout(TEST_TIMEOUT, client.left()).await.unwrap();

    // Assert
    assert!(matches!(
        result,
        Err(TransportError::Request { ref route, .. }) if route == "left"
    ));
}

// ── HttpTransport ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_posts_frames_in_send_order() {
    // Arrange
    let (base, log) = spawn_responder("200 OK").await;
    let mut transport = HttpTransport::new(client(base));
    let mut events = transport.open().unwrap();

    // Act
    transport.send_text("start".to_string()).unwrap();
    transport.send_text("angle: 0.50".to_string()).unwrap();
    transport.close().unwrap();

    // Assert
    assert_eq!(events.recv().await, Some(TransportEvent::Opened));
    assert_eq!(
        timeout(TEST_TIMEOUT, events.recv()).await.unwrap(),
        Some(TransportEvent::Closed)
    );
    assert_eq!(
        *log.lock().unwrap(),
        vec!["POST /start HTTP/1.1", "POST /angle:%200.50 HTTP/1.1"]
    );
}

#[tokio::test]
async fn test_transport_reports_first_rejection_as_errored() {
    // Arrange
    let (base, log) = spawn_responder("500 Internal Server Error").await;
    let mut transport = HttpTransport::new(client(base));
    let mut events = transport.open().unwrap();

    // Act
    transport.send_text("start".to_string()).unwrap();

    // Assert
    assert_eq!(events.recv().await, Some(TransportEvent::Opened));
    assert_eq!(
        timeout(TEST_TIMEOUT, events.recv()).await.unwrap(),
        Some(TransportEvent::Errored(TransportError::Status {
            route: "start".to_string(),
            status: 500,
        }))
    );
    assert_eq!(log.lock().unwrap().len(), 1);
}
