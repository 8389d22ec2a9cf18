use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::item::ControlItem;

/// Frame header: 2 bytes, `(kind << 13) | total_len` little-endian.
pub const HEADER_SIZE: usize = 2;

/// Smallest valid frame: header + discriminator, empty body.
pub const MIN_FRAME_SIZE: usize = 4;

/// Largest total frame size the 13-bit length field can declare.
pub const MAX_FRAME_SIZE: usize = 8191;

/// Largest body that fits under [`MAX_FRAME_SIZE`].
pub const MAX_BODY_SIZE: usize = MAX_FRAME_SIZE - MIN_FRAME_SIZE;

/// The eight 3-bit frame kinds, partitioned into the control family
/// (configuration/query/ack) and the data family (sample streaming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    SetControlItem = 0,
    CurrentControlItem = 1,
    ControlItemRange = 2,
    Ack = 3,
    DataItem0 = 4,
    DataItem1 = 5,
    DataItem2 = 6,
    DataItem3 = 7,
}

impl FrameKind {
    /// Decode the 3-bit tag. Every value 0..=7 is a defined kind, so
    /// this is total over the masked input.
    pub fn from_bits(bits: u8) -> FrameKind {
        match bits & 0x07 {
            0 => FrameKind::SetControlItem,
            1 => FrameKind::CurrentControlItem,
            2 => FrameKind::ControlItemRange,
            3 => FrameKind::Ack,
            4 => FrameKind::DataItem0,
            5 => FrameKind::DataItem1,
            6 => FrameKind::DataItem2,
            _ => FrameKind::DataItem3,
        }
    }

    /// The 3-bit wire tag.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Control family: discriminator is a control-item code.
    pub fn is_control(self) -> bool {
        self.bits() <= FrameKind::Ack.bits()
    }

    /// Data family: discriminator is a rolling sequence counter.
    pub fn is_data(self) -> bool {
        !self.is_control()
    }
}

/// One complete protocol frame.
///
/// Immutable value object: constructed once by [`decode_frame`] or the
/// constructors below, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The 3-bit frame kind.
    pub kind: FrameKind,
    /// Item code (control family) or sequence number (data family).
    pub discriminator: u16,
    /// Raw payload following the discriminator.
    pub body: Bytes,
}

impl Frame {
    /// Construct a control-style frame addressing `item`.
    pub fn control(kind: FrameKind, item: ControlItem, body: impl Into<Bytes>) -> Self {
        debug_assert!(kind.is_control());
        Self {
            kind,
            discriminator: item.code(),
            body: body.into(),
        }
    }

    /// Construct a data-style frame carrying `sequence`.
    pub fn data(kind: FrameKind, sequence: u16, body: impl Into<Bytes>) -> Self {
        debug_assert!(kind.is_data());
        Self {
            kind,
            discriminator: sequence,
            body: body.into(),
        }
    }

    /// The registry item this frame addresses, `ControlItem::None`
    /// for data-style frames.
    pub fn item(&self) -> ControlItem {
        if self.kind.is_control() {
            ControlItem::from_code(self.discriminator)
        } else {
            ControlItem::None
        }
    }

    /// The total wire size of this frame (header + discriminator + body).
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.body.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────────────┬────────────────┬──────────────┐
/// │ Header (2B LE)         │ Discriminator  │ Body         │
/// │ (kind << 13) | total   │ (2B LE)        │ (0..=8187 B) │
/// └────────────────────────┴────────────────┴──────────────┘
/// ```
/// `total` counts the entire frame, header included.
pub fn encode_frame(
    kind: FrameKind,
    discriminator: u16,
    body: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let total = MIN_FRAME_SIZE + body.len();
    if total > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: body.len(),
            max: MAX_BODY_SIZE,
        });
    }
    dst.reserve(total);
    dst.put_u16_le(((kind.bits() as u16) << 13) | total as u16);
    dst.put_u16_le(discriminator);
    dst.put_slice(body);
    Ok(())
}

/// Decode one complete frame from `buf`.
///
/// `buf` must hold exactly one frame: the declared total length must
/// equal the buffer length. For control-style kinds the discriminator
/// is resolved through the item registry; an unregistered code yields
/// the soft [`FrameError::UnknownControlItem`] failure. Data-style
/// discriminators are free-running sequence counters and pass through
/// unchecked.
pub fn decode_frame(buf: &[u8]) -> Result<Frame> {
    if buf.len() < MIN_FRAME_SIZE {
        return Err(FrameError::FrameTooShort { len: buf.len() });
    }

    let mut src = buf;
    let header = src.get_u16_le();
    let kind = FrameKind::from_bits((header >> 13) as u8);
    let declared = (header & 0x1FFF) as usize;

    if declared != buf.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: buf.len(),
        });
    }

    let discriminator = src.get_u16_le();

    if kind.is_control() && ControlItem::from_code(discriminator) == ControlItem::None {
        return Err(FrameError::UnknownControlItem {
            code: discriminator,
        });
    }

    Ok(Frame {
        kind,
        discriminator,
        body: Bytes::copy_from_slice(src),
    })
}

/// Extract `(total_len, kind)` from a wire header without requiring
/// the full frame. Used by the stream reassembly in [`crate::reader`].
pub fn peek_header(header: u16) -> (usize, FrameKind) {
    (
        (header & 0x1FFF) as usize,
        FrameKind::from_bits((header >> 13) as u8),
    )
}
