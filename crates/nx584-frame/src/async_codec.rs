//! Tokio codec adapter for panel frames.
//!
//! [`PanelCodec`] plugs the frame format into [`tokio_util::codec::Framed`]
//! so async hosts can read and write panel frames without the blocking
//! [`FrameReader`](crate::FrameReader) and [`FrameWriter`](crate::FrameWriter).
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use tokio_util::codec::FramedRead;
//! use nx584_frame::PanelCodec;
//!
//! let mut frames = FramedRead::new(serial, PanelCodec::new());
//! while let Some(frame) = frames.next().await {
//!     let frame = frame?;
//!     if frame.is_valid() { /* ... */ }
//! }
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, DecodedFrame};
use crate::error::FrameError;
use crate::message::Message;

/// Tokio codec for panel frames.
///
/// Decoding yields every complete frame together with its verification
/// status; it never fails on bad data.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanelCodec;

impl PanelCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PanelCodec {
    type Item = DecodedFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_frame(src))
    }
}

impl Encoder<Message> for PanelCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.as_bytes(), dst)
    }
}

impl Encoder<&[u8]> for PanelCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item, dst)
    }
}
