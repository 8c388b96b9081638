//! Discrete steering nudges for controllers that expose request/response routes.
//!
//! Older controller firmware has no socket endpoint; it only accepts
//! `POST /left` and `POST /right`, each turning the wheels one step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::command::CommandError;

/// One discrete steering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nudge {
    Left,
    Right,
}

impl Nudge {
    /// The HTTP route segment for this nudge (`"left"` / `"right"`).
    pub fn route(self) -> &'static str {
        match self {
            Nudge::Left => "left",
            Nudge::Right => "right",
        }
    }
}

impl fmt::Display for Nudge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

impl FromStr for Nudge {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Nudge::Left),
            "right" => Ok(Nudge::Right),
            other => Err(CommandError::Malformed(other.to_string())),
        }
    }
}
