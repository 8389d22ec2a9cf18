//! Bit-packed frame codec for the NetSDR wire protocol.
//!
//! This is the core value-add layer of the client. Every message is
//! framed with:
//! - A 2-byte little-endian header packing a 3-bit kind and the 13-bit
//!   total frame length (header included)
//! - A 2-byte little-endian discriminator: a control-item code for the
//!   control family, a rolling sequence number for the data family
//! - 0..=8187 bytes of body
//!
//! The codec is pure — no I/O, no state. [`FrameReader`] and
//! [`FrameWriter`] layer blocking stream I/O on top; [`extract_samples`]
//! splits data-frame bodies into fixed-width samples.

pub mod codec;
pub mod error;
pub mod item;
pub mod reader;
pub mod sample;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameKind, HEADER_SIZE, MAX_BODY_SIZE, MAX_FRAME_SIZE,
    MIN_FRAME_SIZE,
};
pub use error::{FrameError, Result};
pub use item::{ControlItem, REGISTERED_ITEMS};
pub use reader::FrameReader;
pub use sample::{extract_samples, Samples};
pub use writer::FrameWriter;
