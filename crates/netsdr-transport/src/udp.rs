use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Largest datagram the device emits (one full protocol frame).
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// The datagram socket carrying streamed sample data.
///
/// Bound to an ephemeral local port and connected to the device's data
/// port so only its datagrams are delivered. Delivery is lossy and
/// unordered; callers must not assume completeness.
pub struct DataSocket {
    inner: UdpSocket,
    remote: SocketAddr,
}

impl DataSocket {
    /// Open a datagram socket toward the device's data port.
    pub fn open(remote: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket =
            UdpSocket::bind(local).map_err(|e| TransportError::Bind {
                addr: local,
                source: e,
            })?;
        socket
            .connect(remote)
            .map_err(|e| TransportError::Connect {
                addr: remote,
                source: e,
            })?;
        info!(%remote, "data socket open");
        Ok(Self {
            inner: socket,
            remote,
        })
    }

    /// The device address this socket is connected to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// The local address datagrams are delivered to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Set read timeout for `recv_datagram`.
    ///
    /// The background receive loop relies on this to poll its stop
    /// flag within a bounded interval.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Receive one datagram into `buf`, returning its length (blocking).
    pub fn recv_datagram(&self, buf: &mut [u8]) -> Result<usize> {
        let len = self.inner.recv(buf)?;
        debug!(len, "datagram received");
        Ok(len)
    }

    /// Try to clone this socket (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self {
            inner: cloned,
            remote: self.remote,
        })
    }
}

impl std::fmt::Debug for DataSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSocket")
            .field("remote", &self.remote)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_receive_datagram() {
        // Stand-in device socket.
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let device_addr = device.local_addr().unwrap();

        let socket = DataSocket::open(device_addr).unwrap();
        let local = socket.local_addr().unwrap();

        device.send_to(b"samples", local).unwrap();

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = socket.recv_datagram(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"samples");
    }

    #[test]
    fn read_timeout_elapses() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let socket = DataSocket::open(device.local_addr().unwrap()).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut buf = [0u8; 16];
        let err = socket.recv_datagram(&mut buf).unwrap_err();
        match err {
            TransportError::Io(e) => assert!(
                e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ignores_datagrams_from_other_peers() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();

        let socket = DataSocket::open(device.local_addr().unwrap()).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let local = socket.local_addr().unwrap();

        stranger.send_to(b"noise", local).unwrap();
        device.send_to(b"signal", local).unwrap();

        let mut buf = [0u8; 16];
        let len = socket.recv_datagram(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"signal");
    }
}
