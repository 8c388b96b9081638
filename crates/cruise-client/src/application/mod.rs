//! Application layer use cases for the client.
//!
//! # What lives here?
//!
//! - **`transport`** – The port the session layer talks through: the
//!   [`transport::Transport`] and [`transport::TransportFactory`] traits and
//!   the typed events an adapter reports.  Concrete adapters are injected
//!   from the infrastructure layer.
//!
//! - **`session`** – Lifecycle states, the live session record, and
//!   [`session::SessionError`].
//!
//! - **`event_bus`** – Delivers connect/disconnect outcomes to the single
//!   waiting caller, and fans out state changes and inbound messages.
//!
//! - **`dispatch`** – Encodes commands into wire frames and hands them to the
//!   adapter.
//!
//! - **`connection_manager`** – The state machine tying it all together; the
//!   only type the UI needs to hold.

pub mod connection_manager;
pub mod dispatch;
pub mod event_bus;
pub mod session;
pub mod transport;
