//! Domain module: command values, input normalization, and discrete nudges.

pub mod command;
pub mod normalize;
pub mod nudge;
