//! Command model: control axes and fixed-point command values.
//!
//! A [`Command`] is a transient value object: it is created for one input
//! event, turned into a wire frame, and forgotten.  There is deliberately no
//! command queue or history anywhere in the client.
//!
//! # Fixed-point values (for beginners)
//!
//! The controller expects every command value with exactly two fractional
//! digits (`"0.75"`, `"-1.00"`).  Rather than carry an `f32` around and
//! round it at the last moment, [`CommandValue`] stores the value as an integer
//! number of hundredths in `[-100, 100]`.  Equality, formatting, and the sign
//! symmetry of the normalizer are then exact, with no floating-point surprises
//! such as `-0.00`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hundredths in a full-scale command (`1.00`).
pub const FULL_SCALE: i16 = 100;

/// Errors raised while building command values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The value is non-finite or lies outside `[-1.0, 1.0]`.
    #[error("command value {0} is outside [-1.00, 1.00] or not finite")]
    InvalidCommandRange(f32),

    /// The maximum meaningful input distance is zero, negative, or not finite.
    #[error("invalid normalization bound {0}: must be a positive finite distance")]
    InvalidBound(f32),

    /// A textual value could not be parsed as a two-decimal command value.
    #[error("malformed command value: {0:?}")]
    Malformed(String),

    /// An axis label was not recognised.
    #[error("unknown axis: {0:?}")]
    UnknownAxis(String),
}

// ── Axis ──────────────────────────────────────────────────────────────────────

/// One of the two independent control channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Steering, driven by the horizontal joystick.
    Angle,
    /// Throttle, driven by the vertical joystick.
    Speed,
}

impl Axis {
    /// Both axes, in a stable order.
    pub const ALL: [Axis; 2] = [Axis::Angle, Axis::Speed];

    /// The label used on the wire (`"angle"` / `"speed"`).
    pub fn label(self) -> &'static str {
        match self {
            Axis::Angle => "angle",
            Axis::Speed => "speed",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Axis {
    type Err = CommandError;

    /// Accepts the wire labels plus the joystick orientation names used by
    /// the console collaborator (`horizontal` / `vertical`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angle" | "horizontal" | "h" => Ok(Axis::Angle),
            "speed" | "vertical" | "v" => Ok(Axis::Speed),
            other => Err(CommandError::UnknownAxis(other.to_string())),
        }
    }
}

// ── CommandValue ──────────────────────────────────────────────────────────────

/// A signed fixed-point command magnitude in `[-1.00, 1.00]`.
///
/// # Examples
///
/// ```rust
/// use cruise_core::CommandValue;
///
/// let v = CommandValue::try_from_f32(0.753).unwrap();
/// assert_eq!(v.to_string(), "0.75");
/// assert!(CommandValue::try_from_f32(-2.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct CommandValue(i16);

impl CommandValue {
    /// The release command, `0.00`.
    pub const ZERO: CommandValue = CommandValue(0);
    /// Full positive deflection, `1.00`.
    pub const MAX: CommandValue = CommandValue(FULL_SCALE);
    /// Full negative deflection, `-1.00`.
    pub const MIN: CommandValue = CommandValue(-FULL_SCALE);

    /// Builds a value from an already-normalized float, rounding to two decimals.
    ///
    /// Rounding is half-away-from-zero, which keeps `v(-x) == -v(x)` exact.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommandRange`] when `value` is NaN,
    /// infinite, or outside `[-1.0, 1.0]`.
    pub fn try_from_f32(value: f32) -> Result<Self, CommandError> {
        if !value.is_finite() || value.abs() > 1.0 {
            return Err(CommandError::InvalidCommandRange(value));
        }
        Ok(Self((value * f32::from(FULL_SCALE)).round() as i16))
    }

    /// Builds a value from an integer number of hundredths.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommandRange`] outside `[-100, 100]`.
    pub fn from_hundredths(hundredths: i16) -> Result<Self, CommandError> {
        if !(-FULL_SCALE..=FULL_SCALE).contains(&hundredths) {
            return Err(CommandError::InvalidCommandRange(
                f32::from(hundredths) / f32::from(FULL_SCALE),
            ));
        }
        Ok(Self(hundredths))
    }

    /// Returns the value as an integer number of hundredths.
    pub fn hundredths(self) -> i16 {
        self.0
    }

    /// Returns the value as a float (exact to two decimals).
    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / f32::from(FULL_SCALE)
    }

    /// Returns `true` for the release command `0.00`.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Neg for CommandValue {
    type Output = CommandValue;

    fn neg(self) -> Self::Output {
        CommandValue(-self.0)
    }
}

impl TryFrom<f32> for CommandValue {
    type Error = CommandError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::try_from_f32(value)
    }
}

impl TryFrom<i16> for CommandValue {
    type Error = CommandError;

    fn try_from(hundredths: i16) -> Result<Self, Self::Error> {
        Self::from_hundredths(hundredths)
    }
}

impl From<CommandValue> for i16 {
    fn from(value: CommandValue) -> Self {
        value.0
    }
}

impl fmt::Display for CommandValue {
    /// Formats with exactly two fractional digits; zero is always `0.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for CommandValue {
    type Err = CommandError;

    /// Parses the wire form: an optional `-`, one integer digit, a dot, and
    /// exactly two fractional digits.  Parsing is exact (no float round trip).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CommandError::Malformed(s.to_string());

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = digits.split_once('.').ok_or_else(malformed)?;
        if int_part.len() != 1
            || frac_part.len() != 2
            || !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let int: i16 = int_part.parse().map_err(|_| malformed())?;
        let frac: i16 = frac_part.parse().map_err(|_| malformed())?;
        let magnitude = int * 100 + frac;
        Self::from_hundredths(if negative { -magnitude } else { magnitude })
    }
}

// ── Command ───────────────────────────────────────────────────────────────────

/// One motion command for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub axis: Axis,
    pub value: CommandValue,
}

impl Command {
    /// Creates a command.
    pub fn new(axis: Axis, value: CommandValue) -> Self {
        Self { axis, value }
    }

    /// The "input released" command for `axis`: value `0.00`.
    pub fn release(axis: Axis) -> Self {
        Self::new(axis, CommandValue::ZERO)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
