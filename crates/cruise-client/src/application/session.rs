//! Session lifecycle types: the connection state machine's states, the live
//! session record, and the errors the session layer reports.

use std::fmt;
use std::time::{Duration, Instant};

use cruise_core::CommandError;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::application::event_bus::PendingOp;
use crate::application::transport::{Transport, TransportError};

/// Lifecycle state of the connection to the controller.
///
/// ```text
///                 connect()                Opened + "start" sent
///  Disconnected ─────────────► Connecting ───────────────────────► Connected
///       ▲   ▲                      │                                   │
///       │   │ reset()              │ error / closed                    │ disconnect():
///       │   └──────── Failed ◄─────┘◄────────── error / closed ────────┤ "stop" + close
///       │                                                              ▼
///       └────────────────────────── Closed ─────────────────── Disconnecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Failed,
}

impl SessionState {
    /// `true` if a new `connect()` may start from this state.
    pub fn can_connect(self) -> bool {
        matches!(self, SessionState::Disconnected | SessionState::Failed)
    }

    /// `true` while an open or close is in flight.
    pub fn is_transitioning(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Disconnecting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors reported by the session layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// The adapter could not open a connection to the controller.
    #[error("could not connect to {endpoint}: {source}")]
    TransportOpen {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// An established connection failed or was closed by the controller.
    #[error("connection to controller lost: {0}")]
    TransportIo(#[source] TransportError),

    /// A command value was rejected before dispatch.
    #[error(transparent)]
    InvalidCommand(#[from] CommandError),

    /// A command was issued while the session was not connected.
    #[error("not connected (session is {0})")]
    NotConnected(SessionState),

    /// `connect()` was called while a connect is already in flight.
    #[error("a connect is already in progress")]
    ConnectInProgress,

    /// `connect()` was called on a live session.
    #[error("already connected")]
    AlreadyConnected,

    /// The call collided with a disconnect that is still in flight.
    #[error("a disconnect is already in progress")]
    DisconnectInProgress,

    /// Another caller is already awaiting the outcome of a pending operation.
    #[error("another {0} is already awaiting its outcome")]
    ListenerBusy(PendingOp),

    /// The connection manager went away before the operation completed.
    #[error("the {0} was abandoned before it completed")]
    Abandoned(PendingOp),
}

/// The live connection: one adapter bound to one endpoint.
///
/// A session is created on `connect()` and discarded once the connection
/// reaches `Disconnected` or `Failed`; the next `connect()` builds a new one
/// with a fresh adapter.
pub struct ConnectionSession {
    id: Uuid,
    endpoint: Url,
    transport: Box<dyn Transport>,
    started_at: Instant,
}

impl ConnectionSession {
    pub fn new(id: Uuid, endpoint: Url, transport: Box<dyn Transport>) -> Self {
        Self {
            id,
            endpoint,
            transport,
            started_at: Instant::now(),
        }
    }

    /// Identifier used to tag this session's log lines and adapter events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint.as_str())
            .field("age", &self.age())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
