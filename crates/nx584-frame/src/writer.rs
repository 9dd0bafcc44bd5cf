use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, FRAME_OVERHEAD, MAX_MESSAGE_LEN};
use crate::error::{FrameError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = MAX_MESSAGE_LEN * 2 + FRAME_OVERHEAD;

/// Writes complete frames to any `Write` stream.
///
/// Each frame is written and flushed in one call, so a frame never sits
/// half-sent in a user-space buffer.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Frame and send a validated message (blocking).
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.send(message.as_bytes())
    }

    /// Frame and send raw message bytes.
    pub fn send(&mut self, message: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(message, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        tracing::trace!(len = message.len(), wire_len = self.buf.len(), "frame written");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::decode_frame;

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_message_produces_exact_wire_bytes() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let msg = Message::new(vec![0x24, 0x00]).unwrap();
        writer.write_message(&msg).unwrap();
        assert_eq!(written(writer), vec![0x7E, 0x02, 0x24, 0x00, 0x26, 0x4E]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&[0x1D]).unwrap();
        writer.send(&[0x28]).unwrap();

        let mut wire = BytesMut::from(written(writer).as_slice());
        let f1 = decode_frame(&mut wire).unwrap();
        let f2 = decode_frame(&mut wire).unwrap();
        assert_eq!(f1.message.as_bytes(), &[0x1D]);
        assert_eq!(f2.message.as_bytes(), &[0x28]);
        assert!(wire.is_empty());
    }

    #[test]
    fn oversized_message_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.send(&[0u8; 300]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 300, .. }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(&[0x28]).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_and_would_block() {
        let mut writer = FrameWriter::new(FlakyWriter::default());
        writer.send(&[0x3D, 0x02, 0xFF]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data, vec![0x7E, 0x03, 0x3D, 0x02, 0xFF, 0x42, 0xC7]);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(&[0x28]).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn written_bytes_decode_through_reader() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&[0x86, 0x00, 0x7E, 0x7D]).unwrap();

        let mut reader = crate::reader::FrameReader::new(Cursor::new(written(writer)));
        let frame = reader.read_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.message.as_bytes(), &[0x86, 0x00, 0x7E, 0x7D]);
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails each operation once before succeeding, and accepts two bytes
    /// per write.
    #[derive(Default)]
    struct FlakyWriter {
        writes: usize,
        flushes: usize,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            match self.writes {
                1 => Err(std::io::Error::from(ErrorKind::Interrupted)),
                2 => Err(std::io::Error::from(ErrorKind::WouldBlock)),
                _ => {
                    let n = buf.len().min(2);
                    self.data.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            if self.flushes == 1 {
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
