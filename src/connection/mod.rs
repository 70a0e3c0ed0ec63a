//! Connection state machine and driver.
//!
//! [`Connection`] is the sans-IO heart of the crate: the caller owns the
//! transport, pushes received bytes in with [`Connection::feed`], and
//! registers a data sender that the engine calls with bytes to transmit.
//!
//! ## Lifecycle
//!
//! 1. **Opening** - handshake bytes are buffered and parsed
//! 2. **Open** - frames are decoded and dispatched to the handlers
//! 3. **Closing** - we sent a close frame and wait for the peer's echo
//! 4. **Closed** - all further input is discarded

mod role;
mod state;

pub use role::Role;
pub use state::ConnectionState;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
