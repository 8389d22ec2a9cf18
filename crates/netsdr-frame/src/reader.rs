use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{peek_header, HEADER_SIZE, MIN_FRAME_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reassembles complete frames from any `Read` byte stream.
///
/// TCP delivers an undifferentiated byte stream; this reader buffers
/// partial reads internally and hands out one complete frame's raw
/// bytes at a time. Decoding stays with the caller so soft decode
/// failures (unknown items) can be skipped at the session layer.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next complete frame's raw bytes (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached
    /// before a complete frame arrives. A read timeout on the inner
    /// stream surfaces as `FrameError::Io` with `WouldBlock`/`TimedOut`.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.split_frame()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Split one complete frame off the front of the buffer, or
    /// return `Ok(None)` if more bytes are needed.
    fn split_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = u16::from_le_bytes([self.buf[0], self.buf[1]]);
        let (total, _kind) = peek_header(header);

        // A header declaring fewer than 4 bytes cannot describe any
        // frame; the stream is unrecoverable past this point.
        if total < MIN_FRAME_SIZE {
            return Err(FrameError::FrameTooShort { len: total });
        }

        if self.buf.len() < total {
            return Ok(None);
        }

        Ok(Some(self.buf.split_to(total).freeze()))
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BufMut;

    use super::*;
    use crate::codec::{decode_frame, encode_frame, FrameKind};
    use crate::item::ControlItem;

    fn wire(kind: FrameKind, discriminator: u16, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(kind, discriminator, body, &mut buf).unwrap();
        buf
    }

    #[test]
    fn read_single_frame() {
        let bytes = wire(FrameKind::Ack, ControlItem::ReceiverState.code(), b"\x01");
        let mut reader = FrameReader::new(Cursor::new(bytes.to_vec()));

        let raw = reader.read_frame().unwrap();
        let frame = decode_frame(&raw).unwrap();
        assert_eq!(frame.kind, FrameKind::Ack);
        assert_eq!(frame.item(), ControlItem::ReceiverState);
    }

    #[test]
    fn read_multiple_frames() {
        let mut bytes = wire(FrameKind::Ack, ControlItem::ReceiverState.code(), b"a");
        bytes.extend_from_slice(&wire(
            FrameKind::Ack,
            ControlItem::ReceiverFrequency.code(),
            b"bb",
        ));
        bytes.extend_from_slice(&wire(FrameKind::DataItem0, 7, b"ccc"));

        let mut reader = FrameReader::new(Cursor::new(bytes.to_vec()));

        let f1 = decode_frame(&reader.read_frame().unwrap()).unwrap();
        let f2 = decode_frame(&reader.read_frame().unwrap()).unwrap();
        let f3 = decode_frame(&reader.read_frame().unwrap()).unwrap();

        assert_eq!(f1.item(), ControlItem::ReceiverState);
        assert_eq!(f2.body.as_ref(), b"bb");
        assert_eq!((f3.kind, f3.discriminator), (FrameKind::DataItem0, 7));
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(FrameKind::Ack, ControlItem::ADModes.code(), b"slow");
        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: bytes.to_vec(),
            pos: 0,
        });

        let frame = decode_frame(&reader.read_frame().unwrap()).unwrap();
        assert_eq!(frame.body.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut bytes = wire(FrameKind::Ack, ControlItem::ReceiverState.code(), b"full");
        bytes.truncate(5);

        let mut reader = FrameReader::new(Cursor::new(bytes.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn degenerate_header_rejected() {
        // Header declares a 2-byte total frame, below the 4-byte minimum.
        let mut bytes = BytesMut::new();
        bytes.put_u16_le(2);
        bytes.put_slice(&[0x00; 6]);

        let mut reader = FrameReader::new(Cursor::new(bytes.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooShort { len: 2 }));
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(FrameKind::Ack, ControlItem::RFFilter.code(), b"ok");
        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            bytes: bytes.to_vec(),
            pos: 0,
        });

        let frame = decode_frame(&reader.read_frame().unwrap()).unwrap();
        assert_eq!(frame.body.as_ref(), b"ok");
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
