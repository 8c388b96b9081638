//! Input normalization: raw joystick drag distances to bounded commands.
//!
//! The UI reports how far (in points) the joystick knob has been dragged from
//! its resting position.  The controller only understands values in
//! `[-1.00, 1.00]`, so every distance is divided by the maximum meaningful
//! distance for that joystick and clamped:
//!
//! ```text
//! value = round2(clamp(±distance / max_distance, -1.0, 1.0))
//! ```
//!
//! Dragging past the end of the track is not an error: the knob simply pins
//! at full deflection.  Only a non-finite distance (a UI bug) is rejected.
//!
//! # Sign convention
//!
//! On the input surface a drag to the right is a positive distance, but the
//! vehicle steers left for positive angles, so the horizontal axis is inverted
//! before normalizing.  Screen coordinates also grow downward, so the vertical
//! axis is inverted by default to make an upward drag mean "forward".

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::command::{Axis, Command, CommandError, CommandValue};

/// Normalizes one raw distance against `bound`.
///
/// A distance of exactly zero always yields `0.00`, the "input released"
/// command.
///
/// # Errors
///
/// - [`CommandError::InvalidBound`] if `bound` is zero, negative, or not finite.
/// - [`CommandError::InvalidCommandRange`] if `distance` is not finite.
///
/// # Examples
///
/// ```rust
/// use cruise_core::normalize_distance;
///
/// let v = normalize_distance(37.5, 75.0, false).unwrap();
/// assert_eq!(v.to_string(), "0.50");
///
/// // Far beyond the bound pins at full scale.
/// let v = normalize_distance(-1_000.0, 75.0, false).unwrap();
/// assert_eq!(v.to_string(), "-1.00");
/// ```
pub fn normalize_distance(
    distance: f32,
    bound: f32,
    invert: bool,
) -> Result<CommandValue, CommandError> {
    validate_bound(bound)?;
    if !distance.is_finite() {
        return Err(CommandError::InvalidCommandRange(distance));
    }
    if distance == 0.0 {
        return Ok(CommandValue::ZERO);
    }

    let signed = if invert { -distance } else { distance };
    let ratio = (signed / bound).clamp(-1.0, 1.0);
    let value = CommandValue::try_from_f32(ratio)?;
    trace!(distance, bound, %value, "normalized drag distance");
    Ok(value)
}

fn validate_bound(bound: f32) -> Result<(), CommandError> {
    if bound.is_finite() && bound > 0.0 {
        Ok(())
    } else {
        Err(CommandError::InvalidBound(bound))
    }
}

// ── RawInput ──────────────────────────────────────────────────────────────────

/// A raw drag reading produced by the UI, consumed once by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawInput {
    pub axis: Axis,
    /// Signed drag distance from the resting position.
    pub distance: f32,
    /// Maximum meaningful distance for this axis.
    pub bound: f32,
}

impl RawInput {
    /// Normalizes this reading with the axis' default sign convention.
    ///
    /// # Errors
    ///
    /// See [`normalize_distance`].
    pub fn normalize(&self) -> Result<Command, CommandError> {
        let invert = AxisCalibration::default_invert(self.axis);
        let value = normalize_distance(self.distance, self.bound, invert)?;
        Ok(Command::new(self.axis, value))
    }
}

// ── TrackGeometry ─────────────────────────────────────────────────────────────

/// Geometry of one joystick track on the input surface.
///
/// ```text
///  ◄──────────────── length ────────────────►
///  ╭────────────────────────────────────────╮  ▲
///  │                  (●)                   │  thickness
///  ╰────────────────────────────────────────╯  ▼
///          knob diameter = thickness - padding
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    /// Long side of the track.
    pub length: f32,
    /// Short side of the track.
    pub thickness: f32,
    /// Gap kept between the knob and the track edge.
    pub padding: f32,
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            length: 200.0,
            thickness: 50.0,
            padding: 10.0,
        }
    }
}

impl TrackGeometry {
    /// Diameter of the draggable knob.
    pub fn knob_diameter(&self) -> f32 {
        self.thickness - self.padding
    }

    /// How far the knob can travel from the centre before it hits the edge.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidBound`] when the geometry leaves no room
    /// for the knob to move.
    pub fn max_drag_distance(&self) -> Result<f32, CommandError> {
        let distance = (self.length - self.knob_diameter() - self.padding) / 2.0;
        validate_bound(distance)?;
        Ok(distance)
    }
}

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Bound and sign convention for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    pub bound: f32,
    pub invert: bool,
}

impl AxisCalibration {
    /// Creates a calibration, failing fast on an unusable bound.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidBound`] if `bound` is not a positive
    /// finite number.
    pub fn new(bound: f32, invert: bool) -> Result<Self, CommandError> {
        validate_bound(bound)?;
        Ok(Self { bound, invert })
    }

    /// The input-surface sign convention for `axis`.
    pub fn default_invert(axis: Axis) -> bool {
        match axis {
            // Drag right, steer with a negative angle.
            Axis::Angle => true,
            // Screen y grows downward; drag up means forward.
            Axis::Speed => true,
        }
    }
}

/// Per-axis normalizer built once from configuration.
///
/// Construction validates both bounds, so a misconfigured joystick is
/// reported at startup instead of on the first drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    angle: AxisCalibration,
    speed: AxisCalibration,
}

impl Normalizer {
    /// Creates a normalizer from explicit calibrations.
    pub fn new(angle: AxisCalibration, speed: AxisCalibration) -> Self {
        Self { angle, speed }
    }

    /// Creates a normalizer where both joysticks share `geometry` and use the
    /// default sign convention.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidBound`] if the geometry is degenerate.
    pub fn from_geometry(geometry: &TrackGeometry) -> Result<Self, CommandError> {
        let bound = geometry.max_drag_distance()?;
        Ok(Self {
            angle: AxisCalibration::new(bound, AxisCalibration::default_invert(Axis::Angle))?,
            speed: AxisCalibration::new(bound, AxisCalibration::default_invert(Axis::Speed))?,
        })
    }

    /// Returns the calibration for `axis`.
    pub fn calibration(&self, axis: Axis) -> AxisCalibration {
        match axis {
            Axis::Angle => self.angle,
            Axis::Speed => self.speed,
        }
    }

    /// Normalizes a raw drag distance on `axis` into a command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommandRange`] for a non-finite distance.
    pub fn normalize(&self, axis: Axis, distance: f32) -> Result<Command, CommandError> {
        let cal = self.calibration(axis);
        let value = normalize_distance(distance, cal.bound, cal.invert)?;
        Ok(Command::new(axis, value))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        let bound = 75.0;
        Self {
            angle: AxisCalibration { bound, invert: true },
            speed: AxisCalibration { bound, invert: true },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
