//! Message type codes.
//!
//! The first byte of every message is its type. Bit 7 asks the receiver for
//! an acknowledgment, bit 6 is reserved, and bits 0-5 carry the type code.

/// Bit 7: the sender expects an acknowledgment.
pub const ACK_REQUIRED: u8 = 0x80;

/// Bits 0-5: the type code proper.
pub const TYPE_MASK: u8 = 0x3F;

// Panel -> host.

/// Zone name (16 ASCII bytes).
pub const ZONE_NAME: u8 = 0x03;
/// Zone status flags.
pub const ZONE_STATUS: u8 = 0x04;
/// Zone snapshot. Known to arrive with bad checksums.
pub const ZONE_SNAPSHOT: u8 = 0x05;
/// Partition status flags.
pub const PARTITION_STATUS: u8 = 0x06;
/// Partition snapshot (eight partitions).
pub const PARTITION_SNAPSHOT: u8 = 0x07;
/// System status flags.
pub const SYSTEM_STATUS: u8 = 0x08;
/// Log event.
pub const LOG_EVENT: u8 = 0x0A;
/// The panel could not execute the last command.
pub const COMMAND_FAILED: u8 = 0x1C;
/// The panel rejected the last message.
pub const REJECTED: u8 = 0x1F;

// Both directions.

/// Positive acknowledgment.
pub const ACK: u8 = 0x1D;
/// Negative acknowledgment.
pub const NAK: u8 = 0x1E;

// Host -> panel.

/// Zone name request (zone number, zero-based).
pub const ZONE_NAME_REQUEST: u8 = 0x23;
/// Zone status request (zone number, zero-based).
pub const ZONE_STATUS_REQUEST: u8 = 0x24;
/// Partition status request (partition number, zero-based).
pub const PARTITION_STATUS_REQUEST: u8 = 0x26;
/// Partition snapshot request.
pub const PARTITION_SNAPSHOT_REQUEST: u8 = 0x27;
/// System status request.
pub const SYSTEM_STATUS_REQUEST: u8 = 0x28;
/// User information request (without PIN).
pub const USER_INFO_REQUEST: u8 = 0x33;
/// Set clock/calendar.
pub const SET_CLOCK: u8 = 0x3B;
/// Primary keypad function without PIN (arm, disarm, ...).
pub const PRIMARY_KEYPAD_FUNCTION: u8 = 0x3D;

/// Strip the acknowledgment and reserved bits from a type byte.
pub fn type_code(type_byte: u8) -> u8 {
    type_byte & TYPE_MASK
}

/// Returns true if the type byte asks for an acknowledgment.
pub fn ack_required(type_byte: u8) -> bool {
    type_byte & ACK_REQUIRED != 0
}

/// Returns a human-readable name for a type code.
pub fn type_name(code: u8) -> &'static str {
    match code & TYPE_MASK {
        ZONE_NAME => "ZONE_NAME",
        ZONE_STATUS => "ZONE_STATUS",
        ZONE_SNAPSHOT => "ZONE_SNAPSHOT",
        PARTITION_STATUS => "PARTITION_STATUS",
        PARTITION_SNAPSHOT => "PARTITION_SNAPSHOT",
        SYSTEM_STATUS => "SYSTEM_STATUS",
        LOG_EVENT => "LOG_EVENT",
        COMMAND_FAILED => "COMMAND_FAILED",
        ACK => "ACK",
        NAK => "NAK",
        REJECTED => "REJECTED",
        ZONE_NAME_REQUEST => "ZONE_NAME_REQUEST",
        ZONE_STATUS_REQUEST => "ZONE_STATUS_REQUEST",
        PARTITION_STATUS_REQUEST => "PARTITION_STATUS_REQUEST",
        PARTITION_SNAPSHOT_REQUEST => "PARTITION_SNAPSHOT_REQUEST",
        SYSTEM_STATUS_REQUEST => "SYSTEM_STATUS_REQUEST",
        USER_INFO_REQUEST => "USER_INFO_REQUEST",
        SET_CLOCK => "SET_CLOCK",
        PRIMARY_KEYPAD_FUNCTION => "PRIMARY_KEYPAD_FUNCTION",
        _ => "UNKNOWN",
    }
}

/// Returns true if checksum failures on this type code are a known panel
/// quirk rather than line noise.
pub fn checksum_quirk(code: u8) -> bool {
    code & TYPE_MASK == ZONE_SNAPSHOT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_code_ignores_flag_bits() {
        assert_eq!(type_code(0x88), SYSTEM_STATUS);
        assert_eq!(type_code(0xC8), SYSTEM_STATUS);
        assert_eq!(type_code(0x48), SYSTEM_STATUS);
        assert!(ack_required(0x88));
        assert!(!ack_required(0x48));
    }

    #[test]
    fn names_cover_both_directions() {
        assert_eq!(type_name(0x84), "ZONE_STATUS");
        assert_eq!(type_name(ACK), "ACK");
        assert_eq!(type_name(ZONE_STATUS_REQUEST), "ZONE_STATUS_REQUEST");
        assert_eq!(type_name(0x3F), "UNKNOWN");
    }

    #[test]
    fn only_zone_snapshot_has_checksum_quirk() {
        assert!(checksum_quirk(0x85));
        assert!(!checksum_quirk(ZONE_STATUS));
    }
}
