//! Persistent-socket transport over WebSocket (`tokio-tungstenite`).
//!
//! # Task layout
//!
//! `open()` spawns one driver task per adapter and returns immediately.  The
//! driver owns both halves of the socket:
//!
//! ```text
//!  send_text / send_binary / close          event channel
//!        │                                       ▲
//!        ▼                                       │
//!  outbound mpsc ──► driver task (select!) ──────┘
//!                      │        ▲
//!                      ▼        │
//!                   ws sink   ws stream
//! ```
//!
//! Keeping reads and writes in a single `select!` loop means there is no
//! shared lock around the sink, and outbound frames leave in exactly the order
//! they were queued.  After each inbound frame the loop simply polls the
//! stream again, until a close, a receive error, or the close timeout ends it.
//!
//! WebSocket pings are answered by tungstenite itself on the next write or
//! flush; they are not surfaced as events.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::transport::{
    Transport, TransportError, TransportEvent, TransportEvents, TransportFactory,
};

/// Timeouts applied by the WebSocket driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSocketSettings {
    /// Upper bound on TCP connect plus the HTTP upgrade.
    pub connect_timeout: Duration,
    /// How long to wait for the controller to answer our close frame.
    pub close_timeout: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            close_timeout: Duration::from_millis(2000),
        }
    }
}

enum Outbound {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

enum Stage {
    Idle,
    Open(mpsc::UnboundedSender<Outbound>),
    Spent,
}

/// WebSocket adapter bound to one `ws://` / `wss://` endpoint.
pub struct WebSocketTransport {
    endpoint: Url,
    settings: WebSocketSettings,
    stage: Stage,
}

impl WebSocketTransport {
    pub fn new(endpoint: Url, settings: WebSocketSettings) -> Self {
        Self {
            endpoint,
            settings,
            stage: Stage::Idle,
        }
    }

    fn enqueue(&self, frame: Outbound) -> Result<(), TransportError> {
        match &self.stage {
            Stage::Open(tx) => tx
                .send(frame)
                .map_err(|_| TransportError::Io("socket driver has stopped".to_string())),
            Stage::Idle | Stage::Spent => Err(TransportError::NotOpen),
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self) -> Result<TransportEvents, TransportError> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(TransportError::Spent);
        }
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(
            self.endpoint.clone(),
            self.settings,
            outbound_rx,
            event_tx,
        ));
        self.stage = Stage::Open(outbound_tx);
        Ok(event_rx)
    }

    fn send_text(&self, message: String) -> Result<(), TransportError> {
        self.enqueue(Outbound::Text(message))
    }

    fn send_binary(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.enqueue(Outbound::Binary(bytes))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match std::mem::replace(&mut self.stage, Stage::Spent) {
            Stage::Open(tx) => {
                // The driver may already be gone after a peer close.
                let _ = tx.send(Outbound::Close);
                Ok(())
            }
            Stage::Idle => Ok(()),
            Stage::Spent => Err(TransportError::Spent),
        }
    }

    fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Builds a [`WebSocketTransport`] per connect attempt.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransportFactory {
    settings: WebSocketSettings,
}

impl WebSocketTransportFactory {
    pub fn new(settings: WebSocketSettings) -> Self {
        Self { settings }
    }
}

impl TransportFactory for WebSocketTransportFactory {
    fn create(&self, endpoint: &Url) -> Box<dyn Transport> {
        Box::new(WebSocketTransport::new(endpoint.clone(), self.settings))
    }
}

// ── Driver task ───────────────────────────────────────────────────────────────

async fn drive(
    endpoint: Url,
    settings: WebSocketSettings,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |event: TransportEvent| {
        let _ = events.send(event);
    };
    let open_failed = |reason: String| {
        TransportEvent::Errored(TransportError::Open {
            endpoint: endpoint.to_string(),
            reason,
        })
    };

    let socket = match timeout(settings.connect_timeout, connect_async(endpoint.as_str())).await {
        Ok(Ok((socket, _response))) => socket,
        Ok(Err(e)) => {
            warn!(%endpoint, "websocket connect failed: {e}");
            emit(open_failed(e.to_string()));
            return;
        }
        Err(_) => {
            warn!(%endpoint, timeout = ?settings.connect_timeout, "websocket connect timed out");
            emit(open_failed(format!(
                "timed out after {:?}",
                settings.connect_timeout
            )));
            return;
        }
    };
    info!(%endpoint, "websocket open");
    emit(TransportEvent::Opened);

    let (mut sink, mut stream) = socket.split();
    let mut closing = false;
    let close_deadline = sleep(settings.close_timeout);
    tokio::pin!(close_deadline);

    loop {
        tokio::select! {
            queued = outbound.recv(), if !closing => {
                let written = match queued {
                    Some(Outbound::Text(text)) => {
                        debug!(%endpoint, frame = %text, "sending text frame");
                        sink.send(WsMessage::Text(text)).await
                    }
                    Some(Outbound::Binary(bytes)) => {
                        debug!(%endpoint, len = bytes.len(), "sending binary frame");
                        sink.send(WsMessage::Binary(bytes)).await
                    }
                    // Explicit close, or the adapter was dropped.
                    Some(Outbound::Close) | None => {
                        closing = true;
                        close_deadline.as_mut().reset(Instant::now() + settings.close_timeout);
                        debug!(%endpoint, "sending close frame");
                        sink.close().await
                    }
                };
                if let Err(e) = written {
                    if closing {
                        debug!(%endpoint, "close handshake write failed: {e}");
                        emit(TransportEvent::Closed);
                    } else {
                        warn!(%endpoint, "websocket write failed: {e}");
                        emit(TransportEvent::Errored(TransportError::Io(e.to_string())));
                    }
                    return;
                }
            }

            inbound = stream.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => emit(TransportEvent::TextReceived(text)),
                Some(Ok(WsMessage::Binary(bytes))) => emit(TransportEvent::BinaryReceived(bytes)),
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(%endpoint, ?frame, "close frame received");
                    emit(TransportEvent::Closed);
                    return;
                }
                Some(Ok(_)) => {}
                None | Some(Err(WsError::ConnectionClosed)) => {
                    info!(%endpoint, "websocket closed");
                    emit(TransportEvent::Closed);
                    return;
                }
                Some(Err(e)) => {
                    if closing {
                        debug!(%endpoint, "receive error during close: {e}");
                        emit(TransportEvent::Closed);
                    } else {
                        warn!(%endpoint, "websocket receive failed: {e}");
                        emit(TransportEvent::Errored(TransportError::Io(e.to_string())));
                    }
                    return;
                }
            },

            () = &mut close_deadline, if closing => {
                warn!(%endpoint, timeout = ?settings.close_timeout, "close handshake timed out");
                emit(TransportEvent::Closed);
                return;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
