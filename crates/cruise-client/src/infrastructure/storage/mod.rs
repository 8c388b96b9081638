//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML settings file from the
//! platform-appropriate directory and turns it into validated runtime
//! settings (endpoints, timeouts, joystick normalizer).  A missing file is
//! not an error; the defaults describe a stock controller on
//! `raspberrypi.local`.

pub mod config;
