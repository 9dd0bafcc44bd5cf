//! Frame codec for the NX-584 serial panel protocol.
//!
//! Every message travels in a frame:
//! - A 0x7E start byte
//! - A one-byte length counting the unstuffed message bytes
//! - The message, with 0x7E and 0x7D escaped as 0x7D 0x5E and 0x7D 0x5D
//! - Two checksum bytes computed over the unstuffed message
//!
//! Decoding resynchronizes on the start byte and reports bad checksums as a
//! frame status instead of an error, because the receive path must keep
//! going no matter what the line delivers.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod message;
pub mod message_type;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::PanelCodec;
pub use codec::{
    checksum, decode_frame, encode_frame, stuff, unstuff, DecodedFrame, FrameStatus, Stuffed,
    ESCAPE, FRAME_OVERHEAD, MAX_MESSAGE_LEN, START,
};
pub use error::{FrameError, Result};
pub use message::{hex, Message};
pub use reader::FrameReader;
pub use writer::FrameWriter;
