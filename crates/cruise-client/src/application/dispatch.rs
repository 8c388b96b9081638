//! Command dispatcher: turns commands and handshakes into wire frames and
//! hands them to a transport.
//!
//! The dispatcher is stateless.  Whether a send is *allowed* (the session must
//! be connected) is decided by the connection manager before it gets here.

use cruise_core::{encode_frame, Axis, Command, CommandValue, Frame};
use tracing::trace;

use crate::application::transport::{Transport, TransportError};

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandDispatcher;

impl CommandDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Encodes one axis command as `"<axis>: <value>"` and queues it.
    ///
    /// # Errors
    ///
    /// Propagates the transport's error unchanged.
    pub fn send(
        &self,
        transport: &dyn Transport,
        axis: Axis,
        value: CommandValue,
    ) -> Result<(), TransportError> {
        self.send_frame(transport, Frame::Command(Command::new(axis, value)))
    }

    /// Queues any frame, including the `start` / `stop` handshakes.
    ///
    /// # Errors
    ///
    /// Propagates the transport's error unchanged.
    pub fn send_frame(&self, transport: &dyn Transport, frame: Frame) -> Result<(), TransportError> {
        let text = encode_frame(&frame);
        trace!(frame = %text, endpoint = %transport.endpoint(), "dispatching frame");
        transport.send_text(text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::recording::{
        RecordingBehavior, RecordingHandle, RecordingTransport, TransportCall,
    };
    use url::Url;

    fn opened_transport() -> (RecordingTransport, RecordingHandle) {
        let endpoint = Url::parse("ws://controller.test:3002").unwrap();
        let (mut transport, handle) = RecordingTransport::new(endpoint, RecordingBehavior::default());
        transport.open().unwrap();
        (transport, handle)
    }

    #[test]
    fn test_send_writes_axis_and_two_decimal_value() {
        // Arrange
        let (transport, handle) = opened_transport();
        let dispatcher = CommandDispatcher::new();

        // Act
        dispatcher
            .send(&transport, Axis::Angle, CommandValue::try_from_f32(0.5).unwrap())
            .unwrap();
        dispatcher
            .send(&transport, Axis::Speed, CommandValue::try_from_f32(-0.25).unwrap())
            .unwrap();

        // Assert
        assert_eq!(handle.sent_texts(), vec!["angle: 0.50", "speed: -0.25"]);
    }

    #[test]
    fn test_send_frame_writes_handshakes_verbatim() {
        let (transport, handle) = opened_transport();
        let dispatcher = CommandDispatcher::new();

        dispatcher.send_frame(&transport, Frame::Start).unwrap();
        dispatcher.send_frame(&transport, Frame::Stop).unwrap();

        assert_eq!(
            handle.calls(),
            vec![
                TransportCall::Open,
                TransportCall::SendText("start".to_string()),
                TransportCall::SendText("stop".to_string()),
            ]
        );
    }

    #[test]
    fn test_transport_failure_is_propagated() {
        let endpoint = Url::parse("ws://controller.test:3002").unwrap();
        let behavior = RecordingBehavior {
            fail_sends: true,
            ..RecordingBehavior::default()
        };
        let (mut transport, _handle) = RecordingTransport::new(endpoint, behavior);
        transport.open().unwrap();

        let result = CommandDispatcher::new().send(&transport, Axis::Speed, CommandValue::ZERO);

        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
