//! Raw socket plumbing for the NetSDR client.
//!
//! Provides the two transport endpoints the device exposes:
//! - [`ControlStream`] — reliable, ordered TCP stream for commands
//! - [`DataSocket`] — lossy UDP datagram socket for sample streaming
//!
//! This is the lowest layer; it carries bytes and knows nothing about
//! the frame format layered on top by `netsdr-frame`.

pub mod error;
pub mod tcp;
pub mod udp;

pub use error::{Result, TransportError};
pub use tcp::ControlStream;
pub use udp::{DataSocket, MAX_DATAGRAM_SIZE};
