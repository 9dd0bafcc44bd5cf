use std::fmt;
use std::io;

use nx584_frame::FrameError;
use nx584_panel::PanelError;
use nx584_transport::TransportError;

// Exit codes follow sysexits/coreutils conventions where one exists.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidAddress(_) | TransportError::UnsupportedBaud(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::EmptyMessage => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn panel_error(context: &str, err: PanelError) -> CliError {
    match err {
        PanelError::Transport(err) => transport_error(context, err),
        PanelError::Frame(err) => frame_error(context, err),
        PanelError::Io(err) => io_error(context, err),
        PanelError::Timeout(_) | PanelError::QueueFull(_) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        PanelError::InvalidArgument(_) | PanelError::InvalidClock(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        PanelError::Disconnected | PanelError::QueueClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn maps_usage_errors() {
        let err = transport_error(
            "open failed",
            TransportError::InvalidAddress("bogus:".to_string()),
        );
        assert_eq!(err.code, USAGE);
        let err = panel_error("bad zone", PanelError::InvalidArgument("zone 0".into()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn maps_timeouts_and_disconnects() {
        let err = panel_error("flush", PanelError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.code, TIMEOUT);
        let err = panel_error("send", PanelError::Disconnected);
        assert_eq!(err.code, TRANSPORT_ERROR);
        let err = io_error("read", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn panel_hangup_is_a_plain_failure() {
        let err = panel_error("receive", PanelError::Frame(FrameError::ConnectionClosed));
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.to_string(), "receive: connection closed");
    }

    #[test]
    fn maps_bad_messages_to_data_invalid() {
        let err = panel_error("send", PanelError::Frame(FrameError::EmptyMessage));
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(err.to_string(), "send: message is empty (missing type byte)");
    }
}
