use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteStream, StreamShutdown};

/// Serial device transport (8 data bits, no parity, one stop bit, raw mode).
///
/// Reads honour an optional timeout implemented with `poll(2)`, because a
/// read blocked on a tty cannot be interrupted by closing another handle.
pub struct SerialPort {
    file: File,
    path: PathBuf,
    /// Read timeout in milliseconds; zero blocks indefinitely.
    read_timeout_ms: AtomicU64,
}

impl SerialPort {
    /// Baud rate used when an address does not name one.
    pub const DEFAULT_BAUD: u32 = crate::DEFAULT_BAUD;

    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(baud).ok_or(TransportError::UnsupportedBaud(baud))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            // Without O_NONBLOCK the open waits for carrier detect on ports
            // whose saved settings lack CLOCAL.
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        configure_raw(&file, speed)
            .and_then(|()| clear_nonblocking(&file))
            .map_err(|e| TransportError::Configure {
                path: path.clone(),
                source: e,
            })?;

        info!(?path, baud, "opened serial port");

        Ok(Self {
            file,
            path,
            read_timeout_ms: AtomicU64::new(0),
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn wait_readable(&self, timeout_ms: u64) -> io::Result<()> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout = libc::c_int::try_from(timeout_ms).unwrap_or(libc::c_int::MAX);

        // SAFETY: `pfd` is a valid, writable pollfd and the count matches the single entry.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout) };
        match rc {
            0 => Err(io::Error::from(io::ErrorKind::TimedOut)),
            n if n < 0 => Err(io::Error::last_os_error()),
            _ => Ok(()),
        }
    }
}

/// Map a numeric baud rate onto its termios speed constant.
pub fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    match baud {
        1200 => Some(libc::B1200),
        2400 => Some(libc::B2400),
        4800 => Some(libc::B4800),
        9600 => Some(libc::B9600),
        19200 => Some(libc::B19200),
        38400 => Some(libc::B38400),
        57600 => Some(libc::B57600),
        115200 => Some(libc::B115200),
        _ => None,
    }
}

fn configure_raw(file: &File, speed: libc::speed_t) -> io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: an all-zero termios is a valid out-parameter for tcgetattr.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by `file`; `tio` is writable.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `tio` was initialised by tcgetattr above.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    // Three-wire link: no hardware flow control, leave modem lines alone on close.
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB | libc::CRTSCTS | libc::HUPCL);
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `tio` is a valid termios and `speed` is a termios speed constant.
    if unsafe { libc::cfsetispeed(&mut tio, speed) } != 0
        || unsafe { libc::cfsetospeed(&mut tio, speed) } != 0
    {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tio` is fully initialised.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // Stale bytes from before the open would desynchronise the first frame.
    // SAFETY: `fd` is an open tty descriptor.
    if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Return the descriptor to blocking mode once the line settings are in place.
fn clear_nonblocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: `fd` is an open descriptor owned by `file`.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above; only the O_NONBLOCK status flag changes.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout_ms = self.read_timeout_ms.load(Ordering::Relaxed);
        if timeout_ms > 0 {
            self.wait_readable(timeout_ms)?;
        }
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl StreamShutdown for SerialPort {
    fn shutdown_stream(&self) -> io::Result<()> {
        debug!(path = ?self.path, "serial port relies on read timeout for shutdown");
        Ok(())
    }
}

impl ByteStream for SerialPort {
    fn try_clone_stream(&self) -> io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            read_timeout_ms: AtomicU64::new(self.read_timeout_ms.load(Ordering::Relaxed)),
        })
    }

    fn set_stream_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        let ms = match timeout {
            Some(d) => u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1),
            None => 0,
        };
        self.read_timeout_ms.store(ms, Ordering::Relaxed);
        Ok(())
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort").field("path", &self.path).finish()
    }
}
