//! Infrastructure layer for the client application.
//!
//! Contains the adapters that touch the outside world: the WebSocket and HTTP
//! transports, the TOML settings file, and the UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `cruise_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`transport`** – Implementations of the `Transport` port, plus a
//!   recording adapter for tests.
//!
//! - **`storage`** – Loading and saving `config.toml` from the platform
//!   configuration directory.
//!
//! - **`ui_bridge`** – Framework-agnostic command handlers exposing the
//!   connection indicator, the Connect/Disconnect button, and the joysticks.

pub mod storage;
pub mod transport;
pub mod ui_bridge;
