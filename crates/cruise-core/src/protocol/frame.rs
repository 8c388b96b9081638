//! Text frame codec for the controller socket.
//!
//! Wire format (one UTF-8 text frame per message):
//! ```text
//! start                  handshake: session begins
//! stop                   handshake: session ends
//! angle: <value>         steering command
//! speed: <value>         throttle command
//! ```
//! `<value>` is a decimal with exactly two fractional digits in
//! `[-1.00, 1.00]`, e.g. `angle: -0.25`.  Negative zero is never written.

use thiserror::Error;

use crate::domain::command::{Axis, Command, CommandError, CommandValue};

/// The handshake frame sent right after the socket opens.
pub const START_FRAME: &str = "start";
/// The handshake frame sent right before the socket is closed.
pub const STOP_FRAME: &str = "stop";

/// Separator between the axis label and the value in a command frame.
const COMMAND_SEPARATOR: &str = ": ";

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// The frame is neither a handshake nor a `<axis>: <value>` command.
    #[error("unrecognised frame: {0:?}")]
    UnknownFrame(String),

    /// The frame looks like a command but its axis or value is invalid.
    #[error("invalid command frame {frame:?}: {source}")]
    InvalidCommand {
        frame: String,
        #[source]
        source: CommandError,
    },
}

/// One discrete message on the controller socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Session handshake: begin.
    Start,
    /// Session handshake: end.
    Stop,
    /// Per-axis motion command.
    Command(Command),
}

impl From<Command> for Frame {
    fn from(cmd: Command) -> Self {
        Frame::Command(cmd)
    }
}

/// Encodes a [`Frame`] into its wire text.
///
/// # Examples
///
/// ```rust
/// use cruise_core::{encode_frame, Axis, Command, CommandValue, Frame};
///
/// let cmd = Command::new(Axis::Angle, CommandValue::try_from_f32(0.753).unwrap());
/// assert_eq!(encode_frame(&Frame::Command(cmd)), "angle: 0.75");
/// assert_eq!(encode_frame(&Frame::Start), "start");
/// ```
pub fn encode_frame(frame: &Frame) -> String {
    match frame {
        Frame::Start => START_FRAME.to_string(),
        Frame::Stop => STOP_FRAME.to_string(),
        Frame::Command(cmd) => format!("{}{COMMAND_SEPARATOR}{}", cmd.axis.label(), cmd.value),
    }
}

/// Decodes wire text into a [`Frame`].
///
/// The client never receives command frames; this is used by controller
/// simulators and tests to check exactly what went over the wire.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownFrame`] for text that is not a handshake or
/// command, and [`ProtocolError::InvalidCommand`] for a command with a bad axis
/// label or value.
pub fn decode_frame(text: &str) -> Result<Frame, ProtocolError> {
    match text {
        START_FRAME => return Ok(Frame::Start),
        STOP_FRAME => return Ok(Frame::Stop),
        _ => {}
    }

    let (label, value) = text
        .split_once(COMMAND_SEPARATOR)
        .ok_or_else(|| ProtocolError::UnknownFrame(text.to_string()))?;

    let invalid = |source| ProtocolError::InvalidCommand {
        frame: text.to_string(),
        source,
    };
    let axis = match label {
        "angle" => Axis::Angle,
        "speed" => Axis::Speed,
        other => return Err(invalid(CommandError::UnknownAxis(other.to_string()))),
    };
    let value: CommandValue = value.parse().map_err(invalid)?;
    Ok(Frame::Command(Command::new(axis, value)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
