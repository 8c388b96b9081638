//! Transport port: the capability set the session layer needs from a connection.
//!
//! The application layer only depends on the [`Transport`] and
//! [`TransportFactory`] traits defined here.  The WebSocket, HTTP, and
//! in-memory recording implementations live in the infrastructure layer and
//! are injected at construction time, which keeps the connection manager
//! fully unit-testable.
//!
//! # One-shot adapters
//!
//! The underlying socket primitive cannot be reopened once it has been
//! closed.  Rather than pretending otherwise, a [`Transport`] is single-use:
//! `open()` may be called once, and after `close()` (or an error) the value is
//! simply dropped.  The connection manager asks its [`TransportFactory`] for a
//! brand-new adapter on every `connect()`.
//!
//! # Event channel
//!
//! `open()` returns the receiving end of a typed event channel.  Everything
//! the adapter has to report (opened, closed, inbound frames, errors) arrives
//! there in order, so the caller consumes one stream instead of wiring up a
//! callback per event kind.

use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Receiving end of an adapter's event channel.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Errors reported by transport adapters.
///
/// The type is `Clone` so the same cause can be forwarded on the event
/// channel and handed to the listener awaiting a connect/disconnect outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to open {endpoint}: {reason}")]
    Open { endpoint: String, reason: String },

    /// A send or receive failed on an established connection.
    #[error("transport I/O error: {0}")]
    Io(String),

    /// A request/response call returned a status outside `200..300`.
    #[error("request to /{route} failed with HTTP status {status}")]
    Status { route: String, status: u16 },

    /// A request/response call could not be completed at all.
    #[error("request to /{route} failed: {reason}")]
    Request { route: String, reason: String },

    /// The controller closed the connection without being asked to.
    #[error("connection closed by controller")]
    ClosedByPeer,

    /// The adapter has not been opened, or has already been closed.
    #[error("transport is not open")]
    NotOpen,

    /// `open()` or `close()` was called on an adapter that was already used.
    #[error("transport instance already used; construct a new one")]
    Spent,
}

/// Asynchronous notifications emitted by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and sends will reach the controller.
    Opened,
    /// The connection is closed; the adapter is spent.
    Closed,
    /// A text frame arrived from the controller.
    TextReceived(String),
    /// A binary frame arrived from the controller.
    BinaryReceived(Vec<u8>),
    /// The adapter failed and is now terminal.
    Errored(TransportError),
}

/// A single-use, non-blocking connection to the vehicle controller.
///
/// Implementations must never block the caller: sends are queued and the
/// actual I/O happens on a background task.  Sends from one caller must reach
/// the wire in call order.
pub trait Transport: Send {
    /// Starts connecting and returns the adapter's event channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spent`] if the adapter was already opened,
    /// or [`TransportError::Open`] if the attempt fails before any I/O starts.
    fn open(&mut self) -> Result<TransportEvents, TransportError>;

    /// Queues a UTF-8 text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] before `open()` / after `close()`,
    /// or [`TransportError::Io`] if the background I/O task has stopped.
    fn send_text(&self, message: String) -> Result<(), TransportError>;

    /// Queues a binary frame.
    ///
    /// # Errors
    ///
    /// Same as [`Transport::send_text`].
    fn send_binary(&self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Starts an orderly close.  Completion is reported as [`TransportEvent::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spent`] if the adapter was already closed.
    fn close(&mut self) -> Result<(), TransportError>;

    /// The endpoint this adapter is bound to.
    fn endpoint(&self) -> &Url;
}

/// Builds fresh transport adapters bound to an endpoint.
#[cfg_attr(test, mockall::automock)]
pub trait TransportFactory: Send + Sync {
    /// Constructs a new, unopened adapter for `endpoint`.
    fn create(&self, endpoint: &Url) -> Box<dyn Transport>;
}
