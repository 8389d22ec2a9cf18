use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use netsdr_frame::{FrameError, FrameReader};
use netsdr_transport::ControlStream;
use tracing::{debug, warn};

use crate::channel::CommandChannel;
use crate::error::{ClientError, Result};

/// Inbound frames buffered before the reader thread backpressures.
const INBOUND_QUEUE_DEPTH: usize = 64;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Production command channel over TCP.
///
/// `open` connects and spawns a reader thread that reassembles
/// complete frames off the stream and queues their raw bytes; `close`
/// shuts the socket down (unblocking the reader) and joins the thread.
pub struct TcpCommandChannel {
    addr: SocketAddr,
    conn: Option<Conn>,
}

struct Conn {
    stream: ControlStream,
    inbound: Receiver<Bytes>,
    reader: Option<JoinHandle<()>>,
}

impl TcpCommandChannel {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, conn: None }
    }
}

impl CommandChannel for TcpCommandChannel {
    fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let stream = ControlStream::connect_timeout(self.addr, CONNECT_TIMEOUT)?;
        let reader_stream = stream.try_clone()?;
        let (tx, rx) = mpsc::sync_channel(INBOUND_QUEUE_DEPTH);

        let reader = std::thread::Builder::new()
            .name("netsdr-cmd-rx".to_string())
            .spawn(move || read_loop(reader_stream, tx))
            .map_err(netsdr_transport::TransportError::Io)?;

        self.conn = Some(Conn {
            stream,
            inbound: rx,
            reader: Some(reader),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        use std::io::Write;

        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| ClientError::Disconnected("command channel not open".to_string()))?;
        conn.stream
            .write_all(frame)
            .and_then(|()| conn.stream.flush())
            .map_err(|e| ClientError::Transport(e.into()))
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Bytes> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| ClientError::Disconnected("command channel not open".to_string()))?;
        match conn.inbound.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(ClientError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::Disconnected(
                "command channel closed by peer".to_string(),
            )),
        }
    }

    fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.stream.shutdown() {
                debug!(error = %e, "control stream shutdown");
            }
            if let Some(reader) = conn.reader.take() {
                if reader.join().is_err() {
                    warn!("command reader thread panicked");
                }
            }
        }
    }
}

impl Drop for TcpCommandChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop(stream: ControlStream, tx: SyncSender<Bytes>) {
    let mut reader = FrameReader::new(stream);
    loop {
        match reader.read_frame() {
            Ok(frame) => {
                if tx.send(frame).is_err() {
                    // Session side dropped the receiver.
                    break;
                }
            }
            Err(FrameError::ConnectionClosed) => {
                debug!("control stream closed");
                break;
            }
            Err(e) => {
                debug!(error = %e, "command reader stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    use bytes::BytesMut;
    use netsdr_frame::{decode_frame, encode_frame, ControlItem, FrameKind};

    use super::*;

    fn ack_frame(item: ControlItem) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::Ack, item.code(), &[], &mut buf).unwrap();
        buf
    }

    #[test]
    fn open_send_receive_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let device = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream.try_clone().unwrap());
            let request = reader.read_frame().unwrap();
            let frame = decode_frame(&request).unwrap();
            assert_eq!(frame.item(), ControlItem::ReceiverState);

            let mut stream = stream;
            stream.write_all(&ack_frame(ControlItem::ReceiverState)).unwrap();
        });

        let mut channel = TcpCommandChannel::new(addr);
        channel.open().unwrap();
        assert!(channel.is_open());

        let mut request = BytesMut::new();
        encode_frame(
            FrameKind::CurrentControlItem,
            ControlItem::ReceiverState.code(),
            &[],
            &mut request,
        )
        .unwrap();
        channel.send(&request).unwrap();

        let reply = channel.recv_timeout(Duration::from_secs(2)).unwrap();
        let frame = decode_frame(&reply).unwrap();
        assert_eq!(frame.kind, FrameKind::Ack);

        channel.close();
        assert!(!channel.is_open());
        device.join().unwrap();
    }

    #[test]
    fn open_against_refused_port_errors() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let mut channel = TcpCommandChannel::new(addr);
        let err = channel.open().unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(!channel.is_open());
    }

    #[test]
    fn recv_times_out_without_traffic() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let device = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(200));
        });

        let mut channel = TcpCommandChannel::new(addr);
        channel.open().unwrap();

        let err = channel.recv_timeout(Duration::from_millis(30)).unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));

        channel.close();
        device.join().unwrap();
    }

    #[test]
    fn recv_reports_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let device = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let mut channel = TcpCommandChannel::new(addr);
        channel.open().unwrap();
        device.join().unwrap();

        let err = channel.recv_timeout(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ClientError::Disconnected(_)));
        channel.close();
    }

    #[test]
    fn close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let device = thread::spawn(move || {
            let _ = listener.accept();
        });

        let mut channel = TcpCommandChannel::new(addr);
        channel.open().unwrap();
        channel.close();
        channel.close();
        device.join().unwrap();
    }
}
