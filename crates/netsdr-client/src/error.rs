/// Errors that can occur in client session operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] netsdr_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] netsdr_frame::FrameError),

    /// The connect handshake did not complete.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The channel closed underneath an operation.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// No reply arrived within the response timeout.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, ClientError>;
