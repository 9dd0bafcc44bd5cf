use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::message::Message;

/// Frame start byte.
pub const START: u8 = 0x7E;

/// Escape byte announcing a stuffed 0x7E or 0x7D.
pub const ESCAPE: u8 = 0x7D;

/// Second byte of a stuffed 0x7E.
pub const ESCAPED_START: u8 = 0x5E;

/// Second byte of a stuffed 0x7D.
pub const ESCAPED_ESCAPE: u8 = 0x5D;

/// Largest message the one-byte length field can describe.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Start byte + length byte + two checksum bytes.
pub const FRAME_OVERHEAD: usize = 4;

/// The panel's two-sum checksum over an unstuffed message.
///
/// Both sums start at the message length and accumulate modulo 255 with an
/// end-around carry; a sum that reaches 0xFF folds back to zero. This is a
/// bit-exact contract with the panel firmware.
pub fn checksum(message: &[u8]) -> [u8; 2] {
    let seed = (message.len() & 0xFF) as u8;
    let mut sum1 = seed;
    let mut sum2 = seed;
    for &d in message {
        sum1 = add_mod_255(sum1, d);
        sum2 = add_mod_255(sum2, sum1);
    }
    [sum1, sum2]
}

fn add_mod_255(acc: u8, value: u8) -> u8 {
    let mut sum = acc;
    if 0xFF - sum < value {
        sum = sum.wrapping_add(1);
    }
    sum = sum.wrapping_add(value);
    if sum == 0xFF {
        0
    } else {
        sum
    }
}

/// The on-wire form of one logical byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stuffed {
    /// Sent as-is.
    Plain(u8),
    /// Sent as [`ESCAPE`] followed by the contained byte.
    Escaped(u8),
}

impl Stuffed {
    /// Append the wire bytes to `dst`.
    pub fn put(self, dst: &mut impl BufMut) {
        match self {
            Stuffed::Plain(b) => dst.put_u8(b),
            Stuffed::Escaped(b) => {
                dst.put_u8(ESCAPE);
                dst.put_u8(b);
            }
        }
    }

    /// Number of wire bytes.
    pub fn wire_len(self) -> usize {
        match self {
            Stuffed::Plain(_) => 1,
            Stuffed::Escaped(_) => 2,
        }
    }
}

/// Stuff one logical byte.
pub fn stuff(byte: u8) -> Stuffed {
    match byte {
        START => Stuffed::Escaped(ESCAPED_START),
        ESCAPE => Stuffed::Escaped(ESCAPED_ESCAPE),
        other => Stuffed::Plain(other),
    }
}

/// Decode the byte that follows an [`ESCAPE`].
///
/// Returns `None` for anything other than 0x5E or 0x5D.
pub fn unstuff(escaped: u8) -> Option<u8> {
    match escaped {
        ESCAPED_START => Some(START),
        ESCAPED_ESCAPE => Some(ESCAPE),
        _ => None,
    }
}

/// Outcome of checking a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Checksum matched and every escape was well formed.
    Valid,
    /// The received checksum differs from the one computed locally.
    ChecksumMismatch { expected: [u8; 2], received: [u8; 2] },
    /// An escape byte was followed by something other than 0x5E or 0x5D.
    InvalidEscape { byte: u8 },
}

/// A frame taken off the wire, valid or not.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// The unstuffed message.
    pub message: Message,
    /// Whether the frame passed verification.
    pub status: FrameStatus,
}

impl DecodedFrame {
    /// True if the frame may be handed to consumers.
    pub fn is_valid(&self) -> bool {
        self.status == FrameStatus::Valid
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────┬──────────────────────┬──────────────┐
/// │ 0x7E   │ Length   │ Message (stuffed)     │ Sum1 │ Sum2  │
/// │ (1B)   │ (1B)     │ Length logical bytes  │ (unstuffed)  │
/// └────────┴──────────┴──────────────────────┴──────────────┘
/// ```
pub fn encode_frame(message: &[u8], dst: &mut BytesMut) -> Result<()> {
    if message.len() > MAX_MESSAGE_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: message.len(),
            max: MAX_MESSAGE_LEN,
        });
    }
    let stuffed_len: usize = message.iter().map(|&b| stuff(b).wire_len()).sum();
    dst.reserve(FRAME_OVERHEAD + stuffed_len);
    dst.put_u8(START);
    dst.put_u8(message.len() as u8);
    for &b in message {
        stuff(b).put(dst);
    }
    dst.put_slice(&checksum(message));
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Bytes before the next start byte are discarded. Returns `None` if the
/// buffer doesn't hold a complete frame yet; in that case nothing past the
/// start byte is consumed. The length byte counts logical bytes, so escape
/// sequences are consumed transparently.
pub fn decode_frame(src: &mut BytesMut) -> Option<DecodedFrame> {
    match src.iter().position(|&b| b == START) {
        Some(skip) => src.advance(skip),
        None => {
            src.clear();
            return None;
        }
    }

    let len = usize::from(*src.get(1)?);
    let mut message = BytesMut::with_capacity(len);
    let mut bad_escape = None;
    let mut pos = 2;

    while message.len() < len {
        let byte = *src.get(pos)?;
        if byte == ESCAPE {
            let next = *src.get(pos + 1)?;
            match unstuff(next) {
                Some(original) => message.put_u8(original),
                None => {
                    bad_escape.get_or_insert(next);
                    message.put_u8(ESCAPE);
                }
            }
            pos += 2;
        } else {
            message.put_u8(byte);
            pos += 1;
        }
    }

    let received = [*src.get(pos)?, *src.get(pos + 1)?];
    src.advance(pos + 2);

    let message: Bytes = message.freeze();
    let expected = checksum(&message);
    let status = match bad_escape {
        Some(byte) => FrameStatus::InvalidEscape { byte },
        None if expected != received => FrameStatus::ChecksumMismatch { expected, received },
        None => FrameStatus::Valid,
    };

    Some(DecodedFrame {
        message: Message::decoded(message),
        status,
    })
}
