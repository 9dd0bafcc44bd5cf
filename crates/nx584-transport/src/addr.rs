use std::fmt;
use std::net::TcpStream;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::PanelStream;

/// Where the panel's serial interface can be reached.
///
/// Accepted forms:
/// - `serial:/dev/ttyUSB0@38400` or a bare `/dev/ttyUSB0` (9600 baud)
/// - `tcp:192.168.1.20:4999` for serial-over-IP bridges
/// - `unix:/run/nx584.sock` for simulators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAddr {
    Serial { path: PathBuf, baud: u32 },
    Tcp(String),
    Unix(PathBuf),
}

impl FromStr for TransportAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || TransportError::InvalidAddress(s.to_string());

        if let Some(rest) = s.strip_prefix("tcp:") {
            if rest.is_empty() || !rest.contains(':') {
                return Err(invalid());
            }
            return Ok(Self::Tcp(rest.to_string()));
        }

        if let Some(rest) = s.strip_prefix("unix:") {
            if rest.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Unix(PathBuf::from(rest)));
        }

        let rest = s.strip_prefix("serial:").unwrap_or(s);
        if rest.is_empty() {
            return Err(invalid());
        }
        let (path, baud) = match rest.rsplit_once('@') {
            Some((path, baud)) => (path, baud.parse::<u32>().map_err(|_| invalid())?),
            None => (rest, crate::DEFAULT_BAUD),
        };
        if path.is_empty() {
            return Err(invalid());
        }
        Ok(Self::Serial {
            path: PathBuf::from(path),
            baud,
        })
    }
}

impl fmt::Display for TransportAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { path, baud } => write!(f, "serial:{}@{baud}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Open the transport named by `addr`.
pub fn open(addr: &TransportAddr) -> Result<PanelStream> {
    debug!(%addr, "opening panel transport");
    match addr {
        #[cfg(unix)]
        TransportAddr::Serial { path, baud } => {
            Ok(crate::serial::SerialPort::open(path, *baud)?.into())
        }
        #[cfg(not(unix))]
        TransportAddr::Serial { .. } => Err(TransportError::Unsupported("serial")),
        TransportAddr::Tcp(host) => {
            let stream = TcpStream::connect(host.as_str()).map_err(|e| TransportError::Connect {
                addr: host.clone(),
                source: e,
            })?;
            stream.set_nodelay(true)?;
            Ok(stream.into())
        }
        #[cfg(unix)]
        TransportAddr::Unix(path) => {
            let stream = std::os::unix::net::UnixStream::connect(path).map_err(|e| {
                TransportError::Connect {
                    addr: path.display().to_string(),
                    source: e,
                }
            })?;
            Ok(stream.into())
        }
        #[cfg(not(unix))]
        TransportAddr::Unix(_) => Err(TransportError::Unsupported("unix socket")),
    }
}

/// Parse and open a transport address string.
pub fn open_str(addr: &str) -> Result<PanelStream> {
    open(&addr.parse()?)
}
