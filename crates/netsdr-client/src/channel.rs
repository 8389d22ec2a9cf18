//! Collaborator abstractions the session controller consumes.
//!
//! The session never touches sockets directly; it is handed one
//! implementation of each trait below. Production implementations live
//! in [`crate::tcp`] and [`crate::udp`]; tests inject mocks.

use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// The reliable, ordered command channel (request/response traffic).
///
/// Inbound frames are delivered through an internal queue fed by a
/// background reader; `recv_timeout` pops the next one. Ordering must
/// match the wire, since replies are correlated to requests purely by
/// arrival order.
pub trait CommandChannel: Send {
    /// Establish the underlying connection.
    fn open(&mut self) -> Result<()>;

    /// Whether the connection is currently established.
    fn is_open(&self) -> bool;

    /// Send one encoded frame.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Block until the next inbound frame's raw bytes arrive, or the
    /// timeout elapses.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Tear down the connection and its background reader. Idempotent.
    fn close(&mut self);
}

/// The lossy, unordered streaming channel (sample datagrams).
///
/// Delivery runs on a background loop owned by the implementation; it
/// must never block the command path and must stop within a bounded
/// time when asked.
pub trait StreamChannel: Send {
    /// Begin background datagram delivery. Non-blocking.
    fn start(&mut self) -> Result<()>;

    /// Pop the next received datagram's bytes, waiting up to `timeout`.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Stop the background loop; returns only once it has exited.
    /// Idempotent, and safe to call if the loop was never started.
    fn stop(&mut self);

    /// Release the socket. Implies `stop`. Idempotent.
    fn close(&mut self);
}
