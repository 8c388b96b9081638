//! Transport adapters implementing [`crate::application::transport::Transport`].
//!
//! - **`websocket`** – Persistent socket to `ws://<host>:3002`.  This is the
//!   adapter the connection manager normally runs on.
//! - **`http`** – Request/response adapter and the `/left`, `/right` nudge
//!   client for controllers that only speak HTTP.
//! - **`recording`** – In-memory adapter that records calls, for tests.

pub mod http;
pub mod recording;
pub mod websocket;

pub use http::{HttpControlClient, HttpTransport, HttpTransportFactory, NudgeSender};
pub use recording::{RecordingBehavior, RecordingTransport, RecordingTransportFactory};
pub use websocket::{WebSocketSettings, WebSocketTransport, WebSocketTransportFactory};
