//! The network half of the chess server: wire framing, connection records,
//! the client-command parser and the readiness event loop.

pub mod connection;
pub mod frame;
pub mod protocol;
pub mod server;
