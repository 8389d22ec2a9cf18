use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use netsdr_transport::{DataSocket, TransportError, MAX_DATAGRAM_SIZE};
use tracing::{debug, warn};

use crate::channel::StreamChannel;
use crate::error::{ClientError, Result};

/// Datagrams buffered before the receive loop backpressures. Sized
/// for bursts; overflow drops at the socket, which datagram delivery
/// permits anyway.
const INBOUND_QUEUE_DEPTH: usize = 256;

/// Socket read timeout; bounds how long `stop` waits for the loop to
/// notice the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Production streaming channel over UDP.
///
/// `start` opens the socket and spawns the receive loop; each datagram
/// is queued as-is. `stop` raises the stop flag and joins the loop,
/// leaving already-received datagrams drainable via `recv_timeout`.
pub struct UdpStreamChannel {
    remote: SocketAddr,
    running: Option<Running>,
    inbound: Option<Receiver<Bytes>>,
    local_addr: Option<SocketAddr>,
}

struct Running {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl UdpStreamChannel {
    pub fn new(remote: SocketAddr) -> Self {
        Self {
            remote,
            running: None,
            inbound: None,
            local_addr: None,
        }
    }

    /// The local address datagrams are delivered to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl StreamChannel for UdpStreamChannel {
    fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let socket = DataSocket::open(self.remote)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        self.local_addr = Some(socket.local_addr()?);

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel(INBOUND_QUEUE_DEPTH);

        let handle = std::thread::Builder::new()
            .name("netsdr-iq-rx".to_string())
            .spawn({
                let stop = Arc::clone(&stop);
                move || receive_loop(socket, stop, tx)
            })
            .map_err(TransportError::Io)?;

        self.running = Some(Running { stop, handle });
        self.inbound = Some(rx);
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Bytes> {
        let inbound = self
            .inbound
            .as_ref()
            .ok_or_else(|| ClientError::Disconnected("stream channel not started".to_string()))?;
        match inbound.recv_timeout(timeout) {
            Ok(datagram) => Ok(datagram),
            Err(RecvTimeoutError::Timeout) => Err(ClientError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::Disconnected(
                "stream receive loop exited".to_string(),
            )),
        }
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.store(true, Ordering::Release);
            if running.handle.join().is_err() {
                warn!("stream receive loop panicked");
            }
            debug!("stream receive loop stopped");
        }
        self.local_addr = None;
    }

    fn close(&mut self) {
        self.stop();
        self.inbound = None;
    }
}

impl Drop for UdpStreamChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn receive_loop(socket: DataSocket, stop: Arc<AtomicBool>, tx: SyncSender<Bytes>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    while !stop.load(Ordering::Acquire) {
        match socket.recv_datagram(&mut buf) {
            Ok(len) => {
                if tx.send(Bytes::copy_from_slice(&buf[..len])).is_err() {
                    break;
                }
            }
            Err(TransportError::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                debug!(error = %e, "stream receive loop stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;

    use super::*;

    #[test]
    fn delivers_datagrams_in_background() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut channel = UdpStreamChannel::new(device.local_addr().unwrap());

        channel.start().unwrap();
        let local = channel.local_addr().unwrap();

        device.send_to(b"dg-one", local).unwrap();
        device.send_to(b"dg-two", local).unwrap();

        let first = channel.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = channel.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.as_ref(), b"dg-one");
        assert_eq!(second.as_ref(), b"dg-two");

        channel.stop();
    }

    #[test]
    fn stop_is_bounded_and_idempotent() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut channel = UdpStreamChannel::new(device.local_addr().unwrap());

        channel.start().unwrap();
        let started = std::time::Instant::now();
        channel.stop();
        // One poll interval plus margin.
        assert!(started.elapsed() < Duration::from_secs(1));

        channel.stop();
        channel.close();
    }

    #[test]
    fn stop_before_start_is_safe() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut channel = UdpStreamChannel::new(device.local_addr().unwrap());
        channel.stop();
        channel.close();
    }

    #[test]
    fn queued_datagrams_survive_stop() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut channel = UdpStreamChannel::new(device.local_addr().unwrap());

        channel.start().unwrap();
        let local = channel.local_addr().unwrap();
        device.send_to(b"tail", local).unwrap();

        // Wait for the loop to pick the datagram up before stopping.
        let datagram = channel.recv_timeout(Duration::from_secs(2)).unwrap();
        channel.stop();
        assert_eq!(datagram.as_ref(), b"tail");
    }

    #[test]
    fn recv_before_start_reports_disconnected() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut channel = UdpStreamChannel::new(device.local_addr().unwrap());
        let err = channel.recv_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, ClientError::Disconnected(_)));
    }

    #[test]
    fn restart_after_stop() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut channel = UdpStreamChannel::new(device.local_addr().unwrap());

        channel.start().unwrap();
        channel.stop();

        channel.start().unwrap();
        let local = channel.local_addr().unwrap();
        device.send_to(b"again", local).unwrap();
        let datagram = channel.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(datagram.as_ref(), b"again");
        channel.stop();
    }
}
