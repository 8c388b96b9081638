//! # cruise-core
//!
//! Shared library for the PiCruise remote-control client containing the
//! command model, the input normalizer, and the text frame codec spoken to the
//! vehicle controller.
//!
//! It has zero dependencies on sockets, async runtimes, or UI frameworks, so
//! everything in here is a plain function or value type that can be tested in
//! isolation.
//!
//! # Architecture overview (for beginners)
//!
//! The client drives a small vehicle (a Raspberry Pi "controller") with two
//! on-screen joysticks.  Dragging a joystick knob produces a stream of pixel
//! distances; the vehicle wants a bounded number between -1 and 1 for each of
//! its two control channels (steering and throttle).
//!
//! - **`domain`** – The value types.  An [`Axis`] names a control channel, a
//!   [`CommandValue`] is a fixed-point number in `[-1.00, 1.00]`, and the
//!   [`Normalizer`] turns raw drag distances into commands.
//!
//! - **`protocol`** – How commands travel over the wire.  Each command is a
//!   UTF-8 text frame such as `"angle: -0.25"`; the session handshake uses the
//!   bare frames `"start"` and `"stop"`.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `cruise_core::Command` instead of `cruise_core::domain::command::Command`.
pub use domain::command::{Axis, Command, CommandError, CommandValue};
pub use domain::normalize::{normalize_distance, Normalizer, RawInput, TrackGeometry};
pub use domain::nudge::Nudge;
pub use protocol::frame::{decode_frame, encode_frame, Frame, ProtocolError};
