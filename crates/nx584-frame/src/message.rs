use std::fmt;

use bytes::Bytes;

use crate::codec::MAX_MESSAGE_LEN;
use crate::error::{FrameError, Result};
use crate::message_type;

/// A protocol message: type byte followed by its data bytes.
///
/// Immutable and cheap to clone. Outbound messages are validated on
/// construction; inbound messages are whatever the panel sent.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Message {
    bytes: Bytes,
}

impl Message {
    /// Create an outbound message.
    ///
    /// Rejects empty messages (no type byte) and messages longer than the
    /// one-byte length field allows.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(FrameError::EmptyMessage);
        }
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(FrameError::PayloadTooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(Self { bytes })
    }

    /// Build a fixed-size outbound message; the length is checked at
    /// compile time.
    pub fn from_array<const N: usize>(bytes: [u8; N]) -> Self {
        const { assert!(N >= 1 && N <= MAX_MESSAGE_LEN) };
        Self {
            bytes: Bytes::copy_from_slice(&bytes),
        }
    }

    /// Wrap bytes produced by the decoder without validation.
    pub(crate) fn decoded(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// The raw type byte, including the acknowledgment bit.
    pub fn type_byte(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// The low six bits of the type byte.
    pub fn type_code(&self) -> Option<u8> {
        self.type_byte().map(message_type::type_code)
    }

    /// True if the sender set bit 7 of the type byte.
    pub fn ack_required(&self) -> bool {
        self.type_byte().is_some_and(message_type::ack_required)
    }

    /// True for the one-byte positive acknowledgment the host sends back.
    ///
    /// The panel does not acknowledge an acknowledgment, so the transmitter
    /// must not wait for one after sending it.
    pub fn is_bare_ack(&self) -> bool {
        self.type_byte() == Some(message_type::ACK)
    }

    /// The complete message (type byte included).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Data bytes after the type byte.
    pub fn data(&self) -> &[u8] {
        self.bytes.get(1..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the message and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message[{}]", hex(&self.bytes))
    }
}

/// Format bytes as space-separated upper-case hex, e.g. `7E 02 24 00`.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02X}"));
    }
    out
}
