//! # wsforge - Sans-IO WebSocket Protocol Engine
//!
//! `wsforge` is an RFC 6455 compliant WebSocket protocol engine that owns no
//! sockets, spawns no tasks, and sets no timers. The caller drives the
//! transport: received bytes go in through [`Connection::feed`], and bytes
//! to transmit come out through a registered data sender.
//!
//! ## Features
//!
//! - **Sans-IO core** usable under any runtime, or none at all
//! - **Full RFC 6455 framing**: fragmentation, masking, control frames
//! - **Strict validation** with configurable resource limits
//! - **Handshake handling** for both client and server roles
//!
//! ## Quick Start
//!
//! ```
//! use wsforge::{Config, Connection, Message};
//!
//! let mut conn = Connection::server(Config::default());
//! conn.set_data_sender(|bytes| { /* write `bytes` to the transport */ });
//! conn.on_message(|msg| println!("received: {msg:?}"));
//!
//! // whenever the transport yields bytes:
//! // conn.feed(&received)?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

pub use config::{Config, Limits};
pub use connection::{Connection, ConnectionState, Role};
pub use error::{Error, HandshakeError, Result};
pub use message::{CloseCode, Message};
pub use protocol::{
    Frame, HandshakeRequest, HandshakeResponse, OpCode, WS_GUID, apply_mask, compute_accept_key,
    server_handshake,
};
