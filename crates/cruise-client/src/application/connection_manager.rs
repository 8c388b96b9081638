//! Connection manager: owns the session and drives the lifecycle state machine.
//!
//! # Overview (for beginners)
//!
//! The UI only ever talks to a [`ConnectionManager`].  It asks it to connect,
//! to disconnect, and to send steering/throttle values; the manager decides
//! whether that is allowed in the current state and forwards the work to the
//! transport adapter it owns.
//!
//! ```text
//! UI ──connect()──► ConnectionManager ──create()──► TransportFactory
//!                        │    ▲                          │
//!                        │    │ events (opened/closed/…) ▼
//!                        │    └──────── event pump ◄── Transport ──► wire
//!                        ▼
//!                  SessionEventBus ──► outcome / state / inbound subscribers
//! ```
//!
//! # Concurrency
//!
//! All lifecycle state lives behind one `std::sync::Mutex`.  Every transition
//! and every send happens while that lock is held, and nothing inside it
//! `.await`s, so the lock is only ever held for a few microseconds.  Because
//! the `"start"` handshake is queued under the same lock that flips the state
//! to `Connected`, no command frame can ever reach the wire ahead of it.
//!
//! Each session gets its own event pump task.  The pump holds only a `Weak`
//! reference to the manager, so dropping the last [`ConnectionManager`] clone
//! ends it, and every event is tagged with the session id so a pump belonging
//! to a superseded adapter cannot affect the current one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use cruise_core::{Axis, Command, CommandValue, Frame, Normalizer};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::application::dispatch::CommandDispatcher;
use crate::application::event_bus::{
    InboundMessage, OutcomeReceiver, PendingOp, SessionEventBus, DEFAULT_INBOUND_CAPACITY,
};
use crate::application::session::{ConnectionSession, SessionError, SessionState};
use crate::application::transport::{
    TransportError, TransportEvent, TransportEvents, TransportFactory,
};

/// Static settings of a [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Where every adapter built by this manager connects.
    pub endpoint: Url,
    /// Converts raw drag distances into commands.
    pub normalizer: Normalizer,
    /// Buffer size of the inbound message stream per subscriber.
    pub inbound_capacity: usize,
}

impl ManagerConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            normalizer: Normalizer::default(),
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }
}

struct Inner {
    state: SessionState,
    session: Option<ConnectionSession>,
    bus: SessionEventBus,
}

impl Inner {
    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "session state changed");
            self.state = next;
            self.bus.publish_state(next);
        }
    }

    fn is_current(&self, session_id: Uuid) -> bool {
        self.session.as_ref().map(ConnectionSession::id) == Some(session_id)
    }

    /// Discards the adapter, enters `Failed`, and hands `error` to whoever is
    /// waiting on the pending operation.
    fn fail(&mut self, error: SessionError) {
        match self.session.take() {
            Some(session) => warn!(
                session_id = %session.id(),
                endpoint = %session.endpoint(),
                %error,
                "session failed"
            ),
            None => warn!(%error, "session failed before it was established"),
        }
        self.set_state(SessionState::Failed);
        self.bus.resolve(Err(error));
    }
}

struct Shared {
    factory: Arc<dyn TransportFactory>,
    config: ManagerConfig,
    dispatcher: CommandDispatcher,
    inner: Mutex<Inner>,
}

/// Cloneable handle to the single connection of this process.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Creates a manager in the `Disconnected` state.  No adapter is built
    /// until the first `connect()`.
    pub fn new(factory: Arc<dyn TransportFactory>, config: ManagerConfig) -> Self {
        let bus = SessionEventBus::new(config.inbound_capacity);
        Self {
            shared: Arc::new(Shared {
                factory,
                config,
                dispatcher: CommandDispatcher::new(),
                inner: Mutex::new(Inner {
                    state: SessionState::Disconnected,
                    session: None,
                    bus,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Observation ───────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn endpoint(&self) -> &Url {
        &self.shared.config.endpoint
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.shared.config.normalizer
    }

    /// Id of the live session, if one exists.
    pub fn session_id(&self) -> Option<Uuid> {
        self.lock().session.as_ref().map(ConnectionSession::id)
    }

    /// Watches the lifecycle state.  The receiver starts at the current state.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.lock().bus.subscribe_state()
    }

    /// Subscribes to text and binary frames received from the controller.
    pub fn subscribe_inbound(&self) -> broadcast::Receiver<InboundMessage> {
        self.lock().bus.subscribe_inbound()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts connecting and returns a future for the outcome.
    ///
    /// A fresh adapter is built for every attempt.  Calling this from
    /// `Failed` is the explicit reset.
    ///
    /// # Errors
    ///
    /// Rejects the call without building an adapter when a connect or
    /// disconnect is in flight or the session is already connected.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime, since the session's event
    /// pump is spawned onto it.
    pub fn request_connect(&self) -> Result<OutcomeReceiver, SessionError> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Connecting => return Err(SessionError::ConnectInProgress),
            SessionState::Connected => return Err(SessionError::AlreadyConnected),
            SessionState::Disconnecting => return Err(SessionError::DisconnectInProgress),
            SessionState::Disconnected | SessionState::Failed => {}
        }
        let receiver = inner.bus.register(PendingOp::Connect)?;

        let endpoint = &self.shared.config.endpoint;
        let session_id = Uuid::new_v4();
        let mut transport = self.shared.factory.create(endpoint);
        info!(%session_id, %endpoint, "connecting");

        match transport.open() {
            Ok(events) => {
                inner.session = Some(ConnectionSession::new(
                    session_id,
                    endpoint.clone(),
                    transport,
                ));
                inner.set_state(SessionState::Connecting);
                self.spawn_event_pump(session_id, events);
            }
            Err(source) => {
                inner.fail(SessionError::TransportOpen {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }
        }
        Ok(receiver)
    }

    /// Connects and waits until the session is `Connected` or has failed.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.request_connect()?.await
    }

    /// Sends `"stop"`, closes the adapter, and returns a future for the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] unless the session is
    /// `Connected`; a connect in flight cannot be cancelled.
    pub fn request_disconnect(&self) -> Result<OutcomeReceiver, SessionError> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Connected => {}
            SessionState::Connecting => return Err(SessionError::ConnectInProgress),
            SessionState::Disconnecting => return Err(SessionError::DisconnectInProgress),
            state @ (SessionState::Disconnected | SessionState::Failed) => {
                return Err(SessionError::NotConnected(state))
            }
        }
        let receiver = inner.bus.register(PendingOp::Disconnect)?;

        let dispatcher = self.shared.dispatcher;
        let closed = match inner.session.as_mut() {
            Some(session) => {
                info!(session_id = %session.id(), "disconnecting");
                dispatcher
                    .send_frame(session.transport(), Frame::Stop)
                    .and_then(|()| session.transport_mut().close())
            }
            None => Err(TransportError::NotOpen),
        };
        match closed {
            Ok(()) => inner.set_state(SessionState::Disconnecting),
            Err(e) => inner.fail(SessionError::TransportIo(e)),
        }
        Ok(receiver)
    }

    /// Disconnects and waits until the adapter reports it is closed.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.request_disconnect()?.await
    }

    /// Moves `Failed → Disconnected` without connecting.  Returns `false` in
    /// any other state.
    pub fn reset(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Failed {
            return false;
        }
        inner.session = None;
        inner.set_state(SessionState::Disconnected);
        true
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Sends a steering value in `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidCommand`] for an out-of-range value (checked
    /// first), [`SessionError::NotConnected`] outside `Connected`, and
    /// [`SessionError::TransportIo`] if the send fails.
    pub fn angle(&self, value: f32) -> Result<(), SessionError> {
        self.set_axis(Axis::Angle, value)
    }

    /// Sends a throttle value in `[-1, 1]`.  Errors as for [`Self::angle`].
    pub fn speed(&self, value: f32) -> Result<(), SessionError> {
        self.set_axis(Axis::Speed, value)
    }

    pub fn set_axis(&self, axis: Axis, value: f32) -> Result<(), SessionError> {
        let value = CommandValue::try_from_f32(value)?;
        self.send_command(Command::new(axis, value))
    }

    /// Normalizes a raw joystick drag distance and sends the result.
    pub fn drag(&self, axis: Axis, distance: f32) -> Result<(), SessionError> {
        let command = self.shared.config.normalizer.normalize(axis, distance)?;
        self.send_command(command)
    }

    /// Sends the `0.00` command that ends a drag gesture.
    pub fn release(&self, axis: Axis) -> Result<(), SessionError> {
        self.send_command(Command::release(axis))
    }

    /// Dispatches a validated command on the live session.
    ///
    /// A failed send is connection-fatal: the session enters `Failed`.
    pub fn send_command(&self, command: Command) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let session = match (&inner.session, inner.state) {
            (Some(session), SessionState::Connected) => session,
            (_, state) => return Err(SessionError::NotConnected(state)),
        };
        let sent = self
            .shared
            .dispatcher
            .send(session.transport(), command.axis, command.value);
        if let Err(e) = sent {
            inner.fail(SessionError::TransportIo(e.clone()));
            return Err(SessionError::TransportIo(e));
        }
        Ok(())
    }

    // ── Event pump ────────────────────────────────────────────────────────────

    fn spawn_event_pump(&self, session_id: Uuid, mut events: TransportEvents) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let manager = ConnectionManager { shared };
                if !manager.handle_event(session_id, event) {
                    break;
                }
            }
            debug!(%session_id, "event pump finished");
        });
    }

    /// Applies one adapter event.  Returns `false` once the session is over.
    fn handle_event(&self, session_id: Uuid, event: TransportEvent) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(session_id) {
            debug!(%session_id, ?event, "ignoring event from a superseded session");
            return false;
        }
        let endpoint = self.shared.config.endpoint.to_string();

        match event {
            TransportEvent::Opened => {
                if inner.state != SessionState::Connecting {
                    warn!(%session_id, state = %inner.state, "unexpected opened event");
                    return true;
                }
                let sent = match inner.session.as_ref() {
                    Some(session) => self
                        .shared
                        .dispatcher
                        .send_frame(session.transport(), Frame::Start),
                    None => Err(TransportError::NotOpen),
                };
                match sent {
                    Ok(()) => {
                        inner.set_state(SessionState::Connected);
                        info!(%session_id, %endpoint, "connected");
                        inner.bus.resolve(Ok(()));
                        true
                    }
                    Err(e) => {
                        inner.fail(SessionError::TransportIo(e));
                        false
                    }
                }
            }
            TransportEvent::Closed => {
                match inner.state {
                    SessionState::Disconnecting => {
                        inner.session = None;
                        inner.set_state(SessionState::Disconnected);
                        info!(%session_id, %endpoint, "disconnected");
                        inner.bus.resolve(Ok(()));
                    }
                    SessionState::Connecting => inner.fail(SessionError::TransportOpen {
                        endpoint,
                        source: TransportError::ClosedByPeer,
                    }),
                    _ => inner.fail(SessionError::TransportIo(TransportError::ClosedByPeer)),
                }
                false
            }
            TransportEvent::TextReceived(text) => {
                debug!(%session_id, %text, "text frame received");
                inner.bus.publish_inbound(InboundMessage::Text(text));
                true
            }
            TransportEvent::BinaryReceived(bytes) => {
                debug!(%session_id, len = bytes.len(), "binary frame received");
                inner.bus.publish_inbound(InboundMessage::Binary(bytes));
                true
            }
            TransportEvent::Errored(source) => {
                let error = if inner.state == SessionState::Connecting {
                    SessionError::TransportOpen { endpoint, source }
                } else {
                    SessionError::TransportIo(source)
                };
                inner.fail(error);
                false
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.shared.config.endpoint.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
