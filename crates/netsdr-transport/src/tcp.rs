use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// A connected control stream — implements Read + Write.
///
/// Wraps the TCP connection carrying the device's command/response
/// traffic. The stream is reliable and ordered; framing is layered on
/// top by `netsdr-frame`.
pub struct ControlStream {
    inner: TcpStream,
    peer: SocketAddr,
}

impl ControlStream {
    /// Connect to the device's control port (blocking).
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let stream =
            TcpStream::connect(addr).map_err(|e| TransportError::Connect { addr, source: e })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected to control port");
        Ok(Self {
            inner: stream,
            peer: addr,
        })
    }

    /// Connect with an explicit connect timeout.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| TransportError::Connect { addr, source: e })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected to control port");
        Ok(Self {
            inner: stream,
            peer: addr,
        })
    }

    /// The remote address this stream is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    ///
    /// Used to hand one half to a background reader while the command
    /// path keeps the writing half.
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self {
            inner: cloned,
            peer: self.peer,
        })
    }

    /// Shut down both directions of the stream.
    ///
    /// Unblocks any reader parked in `read()` on another clone.
    pub fn shutdown(&self) -> Result<()> {
        debug!(addr = %self.peer, "shutting down control stream");
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already closed by the peer; shutdown is idempotent here.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

impl Read for ControlStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ControlStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl std::fmt::Debug for ControlStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlStream")
            .field("peer", &self.peer)
            .finish()
    }
}
