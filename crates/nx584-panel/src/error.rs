use std::time::Duration;

/// Errors that can occur in panel connection operations.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] nx584_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] nx584_frame::FrameError),

    /// I/O error while setting up the connection.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The transfer queue was closed; the connection is shutting down.
    #[error("transfer queue closed")]
    QueueClosed,

    /// A bounded enqueue gave up because the queue stayed full.
    #[error("transfer queue full after {0:?}; message not delivered")]
    QueueFull(Duration),

    /// The connection has been disconnected.
    #[error("connection disconnected")]
    Disconnected,

    /// A command argument is outside the range the panel accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The date/time cannot be expressed in the set-clock message.
    #[error("invalid clock value: {0}")]
    InvalidClock(String),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    /// Waiting for the transmitter to drain the queue timed out.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, PanelError>;
