//! Session event bus: delivers connect/disconnect outcomes, state changes, and
//! inbound controller messages to interested parties.
//!
//! # Three kinds of delivery
//!
//! | What                    | Channel            | Who listens                  |
//! |-------------------------|--------------------|------------------------------|
//! | outcome of a pending op | `oneshot`          | the single caller awaiting it |
//! | current state           | `watch`            | the connection indicator     |
//! | inbound text / binary   | `broadcast`        | anyone who subscribed        |
//!
//! The outcome slot holds at most one registration.  A second caller trying
//! to await a pending operation gets [`SessionError::ListenerBusy`] instead of
//! silently replacing the first caller's listener.  Each registration resolves
//! exactly once; the slot is cleared when it resolves.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{broadcast, oneshot, watch};
use tracing::debug;
use uuid::Uuid;

use crate::application::session::{SessionError, SessionState};

/// Result delivered to the caller awaiting a connect or disconnect.
pub type Outcome = Result<(), SessionError>;

/// Default capacity of the inbound message broadcast channel.
pub const DEFAULT_INBOUND_CAPACITY: usize = 64;

/// The operation a registered listener is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingOp {
    Connect,
    Disconnect,
}

impl fmt::Display for PendingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOp::Connect => f.write_str("connect"),
            PendingOp::Disconnect => f.write_str("disconnect"),
        }
    }
}

/// A message received from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Text(String),
    Binary(Vec<u8>),
}

struct Registration {
    id: Uuid,
    op: PendingOp,
    tx: oneshot::Sender<Outcome>,
}

/// Future resolving to the outcome of one pending operation.
///
/// Resolves to [`SessionError::Abandoned`] if the bus is dropped before the
/// operation completes.
#[derive(Debug)]
pub struct OutcomeReceiver {
    id: Uuid,
    op: PendingOp,
    rx: oneshot::Receiver<Outcome>,
}

impl OutcomeReceiver {
    /// The registration id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The operation this receiver is waiting on.
    pub fn op(&self) -> PendingOp {
        self.op
    }
}

impl Future for OutcomeReceiver {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let op = self.op;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SessionError::Abandoned(op))))
    }
}

/// Fan-out point for everything the session layer reports.
pub struct SessionEventBus {
    slot: Option<Registration>,
    state_tx: watch::Sender<SessionState>,
    inbound_tx: broadcast::Sender<InboundMessage>,
}

impl SessionEventBus {
    /// Creates a bus whose inbound channel buffers up to `inbound_capacity`
    /// messages per lagging subscriber.
    pub fn new(inbound_capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let (inbound_tx, _) = broadcast::channel(inbound_capacity.max(1));
        Self {
            slot: None,
            state_tx,
            inbound_tx,
        }
    }

    /// Registers the single outcome listener for `op`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ListenerBusy`] if another registration is still
    /// waiting to be resolved.
    pub fn register(&mut self, op: PendingOp) -> Result<OutcomeReceiver, SessionError> {
        if let Some(existing) = &self.slot {
            return Err(SessionError::ListenerBusy(existing.op));
        }
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        self.slot = Some(Registration { id, op, tx });
        debug!(listener = %id, %op, "outcome listener registered");
        Ok(OutcomeReceiver { id, op, rx })
    }

    /// The operation currently awaiting an outcome, if any.
    pub fn pending(&self) -> Option<PendingOp> {
        self.slot.as_ref().map(|r| r.op)
    }

    /// Delivers `outcome` to the registered listener and clears the slot.
    ///
    /// Returns the operation that was resolved, or `None` if nobody was
    /// waiting.
    pub fn resolve(&mut self, outcome: Outcome) -> Option<PendingOp> {
        let registration = self.slot.take()?;
        if registration.tx.send(outcome).is_err() {
            debug!(
                listener = %registration.id,
                op = %registration.op,
                "outcome listener went away before resolution"
            );
        }
        Some(registration.op)
    }

    /// Publishes a state change to every state subscriber.
    pub fn publish_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    /// Publishes an inbound message.  Dropped silently when nobody listens.
    pub fn publish_inbound(&self, message: InboundMessage) {
        let _ = self.inbound_tx.send(message);
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_inbound(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound_tx.subscribe()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_INBOUND_CAPACITY)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

    #[test]
    fn test_registered_listener_receives_outcome_once() {
        // Arrange
        let mut bus = SessionEventBus::default();
        let receiver = bus.register(PendingOp::Connect).unwrap();
        let mut waiting = task::spawn(receiver);
        assert_pending!(waiting.poll());

        // Act
        let resolved = bus.resolve(Ok(()));

        // Assert
        assert_eq!(resolved, Some(PendingOp::Connect));
        assert!(waiting.is_woken());
        assert_ready_eq!(waiting.poll(), Ok(()));
        assert_eq!(bus.pending(), None);
        assert_eq!(bus.resolve(Ok(())), None, "second resolve finds an empty slot");
    }

    #[test]
    fn test_second_listener_is_rejected_while_first_is_pending() {
        let mut bus = SessionEventBus::default();
        let _first = bus.register(PendingOp::Connect).unwrap();

        let second = bus.register(PendingOp::Disconnect);

        assert_eq!(
            second.unwrap_err(),
            SessionError::ListenerBusy(PendingOp::Connect)
        );
    }

    #[test]
    fn test_slot_is_reusable_after_resolution() {
        let mut bus = SessionEventBus::default();
        let _ = bus.register(PendingOp::Connect).unwrap();
        bus.resolve(Err(SessionError::ConnectInProgress));

        let next = bus.register(PendingOp::Disconnect).unwrap();
        assert_eq!(next.op(), PendingOp::Disconnect);
    }

    #[test]
    fn test_dropping_the_bus_abandons_the_listener() {
        let mut bus = SessionEventBus::default();
        let receiver = bus.register(PendingOp::Disconnect).unwrap();
        let mut waiting = task::spawn(receiver);

        drop(bus);

        let outcome = assert_ready!(waiting.poll());
        assert_eq!(outcome, Err(SessionError::Abandoned(PendingOp::Disconnect)));
    }

    #[test]
    fn test_resolving_after_listener_dropped_does_not_panic() {
        let mut bus = SessionEventBus::default();
        drop(bus.register(PendingOp::Connect).unwrap());
        assert_eq!(bus.resolve(Ok(())), Some(PendingOp::Connect));
    }

    #[test]
    fn test_state_subscribers_see_latest_state() {
        let bus = SessionEventBus::default();
        let rx = bus.subscribe_state();

        bus.publish_state(SessionState::Connecting);
        bus.publish_state(SessionState::Connected);

        assert_eq!(*rx.borrow(), SessionState::Connected);
    }

    #[test]
    fn test_inbound_messages_reach_every_subscriber() {
        let bus = SessionEventBus::default();
        let mut a = bus.subscribe_inbound();
        let mut b = bus.subscribe_inbound();

        bus.publish_inbound(InboundMessage::Text("ack".to_string()));

        assert_eq!(a.try_recv().unwrap(), InboundMessage::Text("ack".to_string()));
        assert_eq!(b.try_recv().unwrap(), InboundMessage::Text("ack".to_string()));
    }

    #[test]
    fn test_publishing_without_subscribers_is_a_no_op() {
        let bus = SessionEventBus::default();
        bus.publish_inbound(InboundMessage::Binary(vec![1, 2, 3]));
        bus.publish_state(SessionState::Failed);
    }
}
