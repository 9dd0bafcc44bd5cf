use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use crate::serial::SerialPort;

/// Unblocks pending I/O on every handle that shares the same stream.
///
/// Object-safe so a connection can keep a type-erased handle around for
/// teardown while the worker threads own the typed read and write halves.
pub trait StreamShutdown: Send + Sync {
    /// Shut down both directions of the stream.
    ///
    /// Transports that cannot interrupt a blocked read (serial devices) return
    /// `Ok(())` and rely on the read timeout installed by
    /// [`ByteStream::set_stream_read_timeout`].
    fn shutdown_stream(&self) -> io::Result<()>;
}

/// A full-duplex byte stream the protocol engine can split into one reader
/// and one writer.
pub trait ByteStream: Read + Write + StreamShutdown + Sized + 'static {
    /// Create a second handle to the same underlying stream.
    fn try_clone_stream(&self) -> io::Result<Self>;

    /// Bound how long a single `read` may block.
    ///
    /// A timed-out read surfaces as `ErrorKind::TimedOut` or `ErrorKind::WouldBlock`.
    fn set_stream_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl StreamShutdown for TcpStream {
    fn shutdown_stream(&self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl ByteStream for TcpStream {
    fn try_clone_stream(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn set_stream_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

#[cfg(unix)]
impl StreamShutdown for UnixStream {
    fn shutdown_stream(&self) -> io::Result<()> {
        match UnixStream::shutdown(self, Shutdown::Both) {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

#[cfg(unix)]
impl ByteStream for UnixStream {
    fn try_clone_stream(&self) -> io::Result<Self> {
        UnixStream::try_clone(self)
    }

    fn set_stream_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        UnixStream::set_read_timeout(self, timeout)
    }
}

/// A connected panel stream implementing Read + Write.
///
/// This is the I/O type returned by [`crate::open`]. It wraps whichever
/// transport the address selected: a serial device, a TCP serial bridge, or
/// a Unix domain socket.
pub struct PanelStream {
    inner: PanelStreamInner,
}

enum PanelStreamInner {
    #[cfg(unix)]
    Serial(SerialPort),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl PanelStream {
    /// Transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(_) => "serial",
            PanelStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            PanelStreamInner::Unix(_) => "unix",
        }
    }
}

#[cfg(unix)]
impl From<SerialPort> for PanelStream {
    fn from(port: SerialPort) -> Self {
        Self {
            inner: PanelStreamInner::Serial(port),
        }
    }
}

impl From<TcpStream> for PanelStream {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: PanelStreamInner::Tcp(stream),
        }
    }
}

#[cfg(unix)]
impl From<UnixStream> for PanelStream {
    fn from(stream: UnixStream) -> Self {
        Self {
            inner: PanelStreamInner::Unix(stream),
        }
    }
}

impl Read for PanelStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(port) => port.read(buf),
            PanelStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            PanelStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for PanelStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(port) => port.write(buf),
            PanelStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            PanelStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(port) => port.flush(),
            PanelStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            PanelStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl StreamShutdown for PanelStream {
    fn shutdown_stream(&self) -> io::Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(port) => port.shutdown_stream(),
            PanelStreamInner::Tcp(stream) => stream.shutdown_stream(),
            #[cfg(unix)]
            PanelStreamInner::Unix(stream) => stream.shutdown_stream(),
        }
    }
}

impl ByteStream for PanelStream {
    fn try_clone_stream(&self) -> io::Result<Self> {
        let inner = match &self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(port) => PanelStreamInner::Serial(port.try_clone_stream()?),
            PanelStreamInner::Tcp(stream) => PanelStreamInner::Tcp(stream.try_clone_stream()?),
            #[cfg(unix)]
            PanelStreamInner::Unix(stream) => PanelStreamInner::Unix(stream.try_clone_stream()?),
        };
        Ok(Self { inner })
    }

    fn set_stream_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PanelStreamInner::Serial(port) => port.set_stream_read_timeout(timeout),
            PanelStreamInner::Tcp(stream) => stream.set_stream_read_timeout(timeout),
            #[cfg(unix)]
            PanelStreamInner::Unix(stream) => stream.set_stream_read_timeout(timeout),
        }
    }
}

impl std::fmt::Debug for PanelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelStream")
            .field("type", &self.kind())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn unix_pair_clone_shares_stream() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut writer = PanelStream::from(left);
        let mut reader = PanelStream::from(right);
        let mut second_writer = writer.try_clone_stream().unwrap();

        writer.write_all(b"ab").unwrap();
        second_writer.write_all(b"cd").unwrap();

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.kind(), "unix");
    }

    #[test]
    fn shutdown_unblocks_reader_clone() {
        let (left, _right) = UnixStream::pair().unwrap();
        let stream = PanelStream::from(left);
        let mut reader = stream.try_clone_stream().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        });

        std::thread::sleep(Duration::from_millis(50));
        stream.shutdown_stream().unwrap();

        let read = handle.join().unwrap().unwrap();
        assert_eq!(read, 0);
    }

    #[test]
    fn read_timeout_surfaces_as_timeout_kind() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut stream = PanelStream::from(left);
        stream
            .set_stream_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn tcp_loopback_roundtrip() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        let mut client = PanelStream::from(client.join().unwrap());
        let mut server = PanelStream::from(server);

        client.write_all(&[0x7E, 0x01]).unwrap();
        let mut buf = [0u8; 2];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x7E, 0x01]);
        assert_eq!(client.kind(), "tcp");
        assert_eq!(format!("{client:?}"), "PanelStream { type: \"tcp\" }");
    }
}
