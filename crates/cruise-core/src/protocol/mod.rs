//! Protocol module containing the text frame codec.

pub mod frame;

pub use frame::{decode_frame, encode_frame, Frame, ProtocolError, START_FRAME, STOP_FRAME};
