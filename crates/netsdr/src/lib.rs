//! NetSDR receiver client for Rust.
//!
//! Talks the NetSDR network protocol: a TCP command link carrying
//! bit-packed control frames and a UDP link streaming IQ sample data.
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP control stream and connected UDP data socket
//! - [`frame`] — Bit-packed frame codec, control-item registry, sample extraction
//! - [`client`] — Session controller: handshake, commands, IQ streaming

/// Re-export transport types.
pub mod transport {
    pub use netsdr_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use netsdr_frame::*;
}

/// Re-export client session types.
pub mod client {
    pub use netsdr_client::*;
}
