//! Session layer for NetSDR-family receivers.
//!
//! [`NetSdrClient`] drives one device connection: the connect
//! handshake, serialized command/response exchange over a
//! [`CommandChannel`], and IQ streaming start/stop over a
//! [`StreamChannel`]. Production channels ([`TcpCommandChannel`],
//! [`UdpStreamChannel`]) sit on `netsdr-transport` sockets and run
//! their own background receive threads; the traits exist so tests
//! and alternative transports can be injected.

pub mod channel;
pub mod error;
pub mod session;
pub mod tcp;
pub mod udp;

pub use channel::{CommandChannel, StreamChannel};
pub use error::{ClientError, Result};
pub use session::{ClientConfig, NetSdrClient, DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT};
pub use tcp::TcpCommandChannel;
pub use udp::UdpStreamChannel;
