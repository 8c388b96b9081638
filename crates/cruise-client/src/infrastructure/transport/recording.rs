//! In-memory recording transport for tests and offline runs.
//!
//! # Why a recording transport?
//!
//! The real adapters need a controller (or a loopback server) on the other
//! end, and their I/O happens on background tasks that tests cannot observe
//! directly.  [`RecordingTransport`] performs no I/O at all:
//!
//! - Every call (`open`, `send_text`, `send_binary`, `close`) is appended to a
//!   shared, ordered log that tests read through a [`RecordingHandle`].
//! - The adapter's event channel is driven either automatically (according to
//!   [`RecordingBehavior`]) or by hand via [`RecordingHandle::emit`].
//!
//! # Usage in tests
//!
//! ```ignore
//! let factory = Arc::new(RecordingTransportFactory::new(RecordingBehavior::default()));
//! let manager = ConnectionManager::new(factory.clone(), config);
//!
//! manager.connect().await?;
//! manager.angle(0.5)?;
//!
//! let handle = factory.last().unwrap();
//! assert_eq!(handle.sent_texts(), vec!["start", "angle: 0.50"]);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use url::Url;

use crate::application::transport::{
    Transport, TransportError, TransportEvent, TransportEvents, TransportFactory,
};

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open,
    SendText(String),
    SendBinary(Vec<u8>),
    Close,
}

/// What `open()` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenBehavior {
    /// Emit `Opened` immediately.
    #[default]
    Succeed,
    /// Return the event channel, then emit `Errored(Open)`.
    Fail,
    /// Return `Err(Open)` from `open()` itself.
    Reject,
    /// Emit nothing; the test drives the channel through the handle.
    Manual,
}

/// Scripted behavior of a [`RecordingTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingBehavior {
    pub open: OpenBehavior,
    /// Emit `Closed` as soon as `close()` is called.
    pub auto_close: bool,
    /// Make every send return [`TransportError::Io`].  Can be flipped later
    /// through [`RecordingHandle::set_fail_sends`].
    pub fail_sends: bool,
}

impl Default for RecordingBehavior {
    fn default() -> Self {
        Self {
            open: OpenBehavior::Succeed,
            auto_close: true,
            fail_sends: false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test-side view of one recording adapter.
#[derive(Debug, Clone)]
pub struct RecordingHandle {
    endpoint: Url,
    calls: Arc<Mutex<Vec<TransportCall>>>,
    fail_sends: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl RecordingHandle {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Every call made on the adapter, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    /// Just the text frames, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                TransportCall::SendText(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Pushes an event onto the adapter's channel as if the network produced
    /// it.  Returns `false` if the receiving side is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Makes subsequent sends on the adapter fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

/// A transport that records calls instead of performing I/O.
pub struct RecordingTransport {
    endpoint: Url,
    behavior: RecordingBehavior,
    calls: Arc<Mutex<Vec<TransportCall>>>,
    fail_sends: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
    pending_rx: Option<TransportEvents>,
    open: bool,
}

impl RecordingTransport {
    pub fn new(endpoint: Url, behavior: RecordingBehavior) -> (Self, RecordingHandle) {
        let (events, rx) = mpsc::unbounded_channel();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fail_sends = Arc::new(AtomicBool::new(behavior.fail_sends));
        let handle = RecordingHandle {
            endpoint: endpoint.clone(),
            calls: Arc::clone(&calls),
            fail_sends: Arc::clone(&fail_sends),
            events: events.clone(),
        };
        let transport = Self {
            endpoint,
            behavior,
            calls,
            fail_sends,
            events,
            pending_rx: Some(rx),
            open: false,
        };
        (transport, handle)
    }

    fn record(&self, call: TransportCall) {
        lock(&self.calls).push(call);
    }

    fn check_sendable(&self) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Io("scripted send failure".to_string()));
        }
        Ok(())
    }
}

impl Transport for RecordingTransport {
    fn open(&mut self) -> Result<TransportEvents, TransportError> {
        let rx = self.pending_rx.take().ok_or(TransportError::Spent)?;
        self.record(TransportCall::Open);

        let refused = || TransportError::Open {
            endpoint: self.endpoint.to_string(),
            reason: "scripted open failure".to_string(),
        };
        match self.behavior.open {
            OpenBehavior::Reject => return Err(refused()),
            OpenBehavior::Fail => {
                let _ = self.events.send(TransportEvent::Errored(refused()));
            }
            OpenBehavior::Succeed => {
                let _ = self.events.send(TransportEvent::Opened);
            }
            OpenBehavior::Manual => {}
        }
        self.open = true;
        Ok(rx)
    }

    fn send_text(&self, message: String) -> Result<(), TransportError> {
        self.record(TransportCall::SendText(message));
        self.check_sendable()
    }

    fn send_binary(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.record(TransportCall::SendBinary(bytes));
        self.check_sendable()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.record(TransportCall::Close);
        if !self.open {
            return Err(TransportError::Spent);
        }
        self.open = false;
        if self.behavior.auto_close {
            let _ = self.events.send(TransportEvent::Closed);
        }
        Ok(())
    }

    fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Factory producing [`RecordingTransport`]s and keeping a handle to each.
#[derive(Debug, Default)]
pub struct RecordingTransportFactory {
    behavior: Mutex<RecordingBehavior>,
    created: Mutex<Vec<RecordingHandle>>,
}

impl RecordingTransportFactory {
    pub fn new(behavior: RecordingBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Changes the behavior of adapters created from now on.
    pub fn set_behavior(&self, behavior: RecordingBehavior) {
        *lock(&self.behavior) = behavior;
    }

    /// Number of adapters created so far.
    pub fn created_count(&self) -> usize {
        lock(&self.created).len()
    }

    /// Handle of the `index`-th created adapter.
    pub fn handle(&self, index: usize) -> Option<RecordingHandle> {
        lock(&self.created).get(index).cloned()
    }

    /// Handle of the most recently created adapter.
    pub fn last(&self) -> Option<RecordingHandle> {
        lock(&self.created).last().cloned()
    }
}

impl TransportFactory for RecordingTransportFactory {
    fn create(&self, endpoint: &Url) -> Box<dyn Transport> {
        let behavior = *lock(&self.behavior);
        let (transport, handle) = RecordingTransport::new(endpoint.clone(), behavior);
        lock(&self.created).push(handle);
        Box::new(transport)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("ws://controller.test:3002").unwrap()
    }

    #[test]
    fn test_open_emits_opened_by_default() {
        let (mut transport, _handle) = RecordingTransport::new(endpoint(), RecordingBehavior::default());

        let mut events = transport.open().unwrap();

        assert_eq!(events.try_recv().unwrap(), TransportEvent::Opened);
    }

    #[test]
    fn test_second_open_is_spent() {
        let (mut transport, _handle) = RecordingTransport::new(endpoint(), RecordingBehavior::default());
        transport.open().unwrap();

        assert_eq!(transport.open().unwrap_err(), TransportError::Spent);
    }

    #[test]
    fn test_send_before_open_is_recorded_and_rejected() {
        let (transport, handle) = RecordingTransport::new(endpoint(), RecordingBehavior::default());

        let result = transport.send_text("angle: 0.10".to_string());

        assert_eq!(result, Err(TransportError::NotOpen));
        assert_eq!(handle.calls(), vec![TransportCall::SendText("angle: 0.10".to_string())]);
    }

    #[test]
    fn test_close_emits_closed_and_blocks_further_sends() {
        let (mut transport, _handle) = RecordingTransport::new(endpoint(), RecordingBehavior::default());
        let mut events = transport.open().unwrap();
        let _ = events.try_recv();

        transport.close().unwrap();

        assert_eq!(events.try_recv().unwrap(), TransportEvent::Closed);
        assert_eq!(transport.send_text("stop".into()), Err(TransportError::NotOpen));
        assert_eq!(transport.close(), Err(TransportError::Spent));
    }

    #[test]
    fn test_fail_behavior_reports_error_on_channel() {
        let behavior = RecordingBehavior {
            open: OpenBehavior::Fail,
            ..RecordingBehavior::default()
        };
        let (mut transport, _handle) = RecordingTransport::new(endpoint(), behavior);

        let mut events = transport.open().unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            TransportEvent::Errored(TransportError::Open { .. })
        ));
    }

    #[test]
    fn test_manual_behavior_lets_handle_drive_events() {
        let behavior = RecordingBehavior {
            open: OpenBehavior::Manual,
            ..RecordingBehavior::default()
        };
        let (mut transport, handle) = RecordingTransport::new(endpoint(), behavior);
        let mut events = transport.open().unwrap();
        assert!(events.try_recv().is_err());

        assert!(handle.emit(TransportEvent::TextReceived("ready".into())));

        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::TextReceived("ready".into())
        );
    }

    #[test]
    fn test_factory_tracks_every_created_adapter() {
        let factory = RecordingTransportFactory::new(RecordingBehavior::default());

        let _a = factory.create(&endpoint());
        let _b = factory.create(&endpoint());

        assert_eq!(factory.created_count(), 2);
        assert!(factory.handle(0).is_some());
        assert_eq!(factory.last().unwrap().endpoint(), &endpoint());
    }
}
