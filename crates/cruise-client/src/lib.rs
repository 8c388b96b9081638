//! cruise-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does cruise-client do? (for beginners)
//!
//! The client is the remote control for a small vehicle whose controller
//! (a Raspberry Pi) listens on a WebSocket.  The client:
//!
//! 1. Opens a session to the controller and sends the `"start"` handshake.
//! 2. Turns joystick drags into bounded commands such as `"angle: -0.50"`
//!    and writes them to the socket as they happen.
//! 3. Sends `"stop"` and closes the socket when the user disconnects.
//! 4. Reports the connection state so the UI can show a
//!    Disconnected / Connecting... / Connected indicator.
//!
//! The session logic lives in `application` and only sees the `Transport`
//! trait; the WebSocket and HTTP implementations live in `infrastructure`.

/// Application layer: session lifecycle, command dispatch, event bus.
pub mod application;

/// Infrastructure layer: transports, settings file, and UI bridge.
pub mod infrastructure;
