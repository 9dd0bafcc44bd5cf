use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_frame, DecodedFrame, FRAME_OVERHEAD, MAX_MESSAGE_LEN};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 2 * (MAX_MESSAGE_LEN * 2 + FRAME_OVERHEAD);
const READ_CHUNK_SIZE: usize = 512;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads and resynchronizes on the start byte, so callers
/// always get whole frames. A read error leaves buffered data in place and
/// the next call resumes where the previous one stopped.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Frames that fail verification are returned too; check
    /// [`DecodedFrame::status`]. Returns `Err(FrameError::ConnectionClosed)`
    /// when EOF is reached.
    pub fn read_frame(&mut self) -> Result<DecodedFrame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf) {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    tracing::debug!(
                        buffered = self.buf.len(),
                        "stream closed with partial frame buffered"
                    );
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet consumed by a complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
