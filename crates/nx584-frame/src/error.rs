/// Errors that can occur during frame encoding or stream I/O.
///
/// Checksum mismatches and malformed escapes are not errors; they are
/// reported through [`crate::FrameStatus`] on the decoded frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message does not fit the one-byte length field.
    #[error("message too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Outbound messages must carry at least a type byte.
    #[error("message is empty (missing type byte)")]
    EmptyMessage,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed (EOF or zero-length write).
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the error is a read timeout rather than a broken stream.
    ///
    /// Partial frame data stays buffered in the reader, so the read can
    /// simply be retried.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
