/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer is shorter than the 4-byte frame minimum.
    #[error("frame too short ({len} bytes, need at least 4)")]
    FrameTooShort { len: usize },

    /// The declared frame length does not match the buffer length.
    #[error("frame length mismatch (header declares {declared}, buffer is {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The body exceeds what the 13-bit length field can describe.
    #[error("frame body too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A control-style frame carries an item code not in the registry.
    ///
    /// Soft failure: the frame is otherwise well-formed and callers
    /// should ignore it rather than tear down the session. Keeps the
    /// client forward-compatible with newer device firmware items.
    #[error("unknown control item code {code:#06x}")]
    UnknownControlItem { code: u16 },

    /// Sample width other than 8, 16, or 32 bits.
    #[error("unsupported sample width ({bits} bits, expected 8/16/32)")]
    UnsupportedSampleWidth { bits: u16 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for decode failures the session may skip past (the frame
    /// was structurally sound but carried an unrecognized item).
    pub fn is_soft(&self) -> bool {
        matches!(self, FrameError::UnknownControlItem { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
