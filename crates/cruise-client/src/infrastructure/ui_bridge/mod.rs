//! UI command bridge for the client.
//!
//! Exposes the connection manager to a presentation layer (the console front
//! end in `main.rs`, or a desktop/mobile shell) through plain functions that
//! take and return serializable values.  Only this module references both the
//! application layer and presentation concepts like button labels.
//!
//! # The control surface (for beginners)
//!
//! The remote has three widgets:
//!
//! ```text
//!  ● Connected            [ Disconnect ]      ← indicator + toggle button
//!
//!  ╭──────(●)──────╮       ╭─╮
//!  ╰───────────────╯       │●│                ← steering and throttle joysticks
//!                          ╰─╯
//! ```
//!
//! - The **indicator** is ternary.  `Disconnecting` is shown as
//!   "Connecting..." because the link is in flux either way.
//! - The **toggle button** reads "Connect" or "Disconnect" and is disabled
//!   while a connect or disconnect is in flight.
//! - The **joysticks** report raw drag distances through [`drag`] and the end
//!   of a gesture through [`release`].
//!
//! # `ClientCommandResult<T>`
//!
//! All handlers return a unified envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```

use cruise_core::{Axis, Nudge};
use serde::{Deserialize, Serialize};

use crate::application::connection_manager::ConnectionManager;
use crate::application::session::SessionState;
use crate::infrastructure::transport::http::NudgeSender;

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// What the connection indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionIndicator {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionIndicator {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionIndicator::Disconnected => "Disconnected",
            ConnectionIndicator::Connecting => "Connecting...",
            ConnectionIndicator::Connected => "Connected",
        }
    }
}

impl From<SessionState> for ConnectionIndicator {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Connected => ConnectionIndicator::Connected,
            SessionState::Connecting | SessionState::Disconnecting => {
                ConnectionIndicator::Connecting
            }
            SessionState::Disconnected | SessionState::Failed => ConnectionIndicator::Disconnected,
        }
    }
}

/// Snapshot of everything the status bar renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDto {
    pub indicator: ConnectionIndicator,
    /// Indicator text, e.g. `"Connecting..."`.
    pub label: String,
    /// Lifecycle state name, e.g. `"failed"`.
    pub state: String,
    /// `"Connect"` or `"Disconnect"`.
    pub button_label: String,
    pub button_enabled: bool,
    pub endpoint: String,
}

impl StatusDto {
    pub fn from_state(state: SessionState, endpoint: &str) -> Self {
        let indicator = ConnectionIndicator::from(state);
        let button_label = if state == SessionState::Connected {
            "Disconnect"
        } else {
            "Connect"
        };
        Self {
            indicator,
            label: indicator.label().to_string(),
            state: state.to_string(),
            button_label: button_label.to_string(),
            button_enabled: !state.is_transitioning(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Unified response wrapper for UI commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientCommandResult<T: Serialize> {
    /// `true` if the command completed successfully; `false` on error.
    pub success: bool,
    /// The command's return value, present only when `success` is `true`.
    pub data: Option<T>,
    /// A human-readable error message, present only when `success` is `false`.
    pub error: Option<String>,
}

impl<T: Serialize> ClientCommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl<T: Serialize, E: std::fmt::Display> From<Result<T, E>> for ClientCommandResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current status snapshot.
pub fn get_status(manager: &ConnectionManager) -> ClientCommandResult<StatusDto> {
    ClientCommandResult::ok(StatusDto::from_state(
        manager.state(),
        manager.endpoint().as_str(),
    ))
}

/// The Connect/Disconnect button.
///
/// Connects from `Disconnected` or `Failed`, disconnects from `Connected`,
/// and waits for the outcome.  Returns the status after the transition.
pub async fn toggle_connection(manager: &ConnectionManager) -> ClientCommandResult<StatusDto> {
    let state = manager.state();
    let outcome = match state {
        SessionState::Connected => manager.disconnect().await,
        SessionState::Disconnected | SessionState::Failed => manager.connect().await,
        SessionState::Connecting | SessionState::Disconnecting => {
            return ClientCommandResult::err(format!("cannot toggle while {state}"));
        }
    };
    match outcome {
        Ok(()) => get_status(manager),
        Err(e) => ClientCommandResult::err(e.to_string()),
    }
}

/// Sets an axis to an explicit value in `[-1, 1]`.
pub fn set_axis(manager: &ConnectionManager, axis: &str, value: f32) -> ClientCommandResult<()> {
    match axis.parse::<Axis>() {
        Ok(axis) => manager.set_axis(axis, value).into(),
        Err(e) => ClientCommandResult::err(e.to_string()),
    }
}

/// A joystick knob moved `distance` points from its centre.
pub fn drag(manager: &ConnectionManager, axis: &str, distance: f32) -> ClientCommandResult<()> {
    match axis.parse::<Axis>() {
        Ok(axis) => manager.drag(axis, distance).into(),
        Err(e) => ClientCommandResult::err(e.to_string()),
    }
}

/// A joystick gesture ended; the knob springs back to the centre.
pub fn release(manager: &ConnectionManager, axis: &str) -> ClientCommandResult<()> {
    match axis.parse::<Axis>() {
        Ok(axis) => manager.release(axis).into(),
        Err(e) => ClientCommandResult::err(e.to_string()),
    }
}

/// One discrete steering step over the HTTP routes.
pub async fn nudge(sender: &dyn NudgeSender, direction: &str) -> ClientCommandResult<()> {
    match direction.parse::<Nudge>() {
        Ok(direction) => sender.nudge(direction).await.into(),
        Err(e) => ClientCommandResult::err(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
