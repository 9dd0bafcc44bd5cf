//! Builders for the messages the host sends to the panel.
//!
//! Zone and partition numbers are 1-based here, as printed on keypads; the
//! wire carries them 0-based.

use chrono::{Datelike, NaiveDateTime, Timelike};
use nx584_frame::message_type::{
    ACK, NAK, PARTITION_SNAPSHOT_REQUEST, PARTITION_STATUS_REQUEST, PRIMARY_KEYPAD_FUNCTION,
    SET_CLOCK, SYSTEM_STATUS_REQUEST, USER_INFO_REQUEST, ZONE_NAME_REQUEST, ZONE_STATUS_REQUEST,
};
use nx584_frame::Message;

use crate::error::{PanelError, Result};

/// Number of partitions the panel supports.
pub const PARTITION_COUNT: u8 = 8;

/// Partition mask that selects every partition.
const ALL_PARTITIONS: u8 = 0xFF;

/// Sub-functions of the primary keypad function message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmAction {
    /// Turn off the sounder without disarming.
    AudibleOff,
    Disarm,
    ArmAway,
    ArmStay,
    AutoArm,
}

impl ArmAction {
    /// The wire sub-code.
    pub fn code(self) -> u8 {
        match self {
            ArmAction::AudibleOff => 0x00,
            ArmAction::Disarm => 0x01,
            ArmAction::ArmAway => 0x02,
            ArmAction::ArmStay => 0x03,
            ArmAction::AutoArm => 0x05,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArmAction::AudibleOff => "audible-off",
            ArmAction::Disarm => "disarm",
            ArmAction::ArmAway => "arm-away",
            ArmAction::ArmStay => "arm-stay",
            ArmAction::AutoArm => "auto-arm",
        }
    }

    pub const ALL: [ArmAction; 5] = [
        ArmAction::AudibleOff,
        ArmAction::Disarm,
        ArmAction::ArmAway,
        ArmAction::ArmStay,
        ArmAction::AutoArm,
    ];
}

impl std::str::FromStr for ArmAction {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        ArmAction::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| PanelError::InvalidArgument(format!("unknown keypad function: {s}")))
    }
}

fn build(bytes: Vec<u8>) -> Result<Message> {
    Ok(Message::new(bytes)?)
}

fn zero_based(what: &str, number: u16) -> Result<u8> {
    match number.checked_sub(1).map(u8::try_from) {
        Some(Ok(n)) => Ok(n),
        _ => Err(PanelError::InvalidArgument(format!(
            "{what} number must be 1..=256, got {number}"
        ))),
    }
}

/// Request the name of a zone.
pub fn zone_name(zone: u16) -> Result<Message> {
    build(vec![ZONE_NAME_REQUEST, zero_based("zone", zone)?])
}

/// Request the status of a zone.
pub fn zone_status(zone: u16) -> Result<Message> {
    build(vec![ZONE_STATUS_REQUEST, zero_based("zone", zone)?])
}

/// Request the status of a partition.
pub fn partition_status(partition: u8) -> Result<Message> {
    if partition == 0 || partition > PARTITION_COUNT {
        return Err(PanelError::InvalidArgument(format!(
            "partition number must be 1..={PARTITION_COUNT}, got {partition}"
        )));
    }
    build(vec![PARTITION_STATUS_REQUEST, partition - 1])
}

/// Request the snapshot of all partitions.
pub fn partition_snapshot() -> Message {
    fixed(PARTITION_SNAPSHOT_REQUEST)
}

/// Request the system status.
pub fn system_status() -> Message {
    fixed(SYSTEM_STATUS_REQUEST)
}

/// Request information about a user. User numbers are sent as-is.
pub fn user_info(user: u8) -> Result<Message> {
    if user == 0 {
        return Err(PanelError::InvalidArgument(
            "user number must be at least 1".to_string(),
        ));
    }
    build(vec![USER_INFO_REQUEST, user])
}

/// Primary keypad function (no PIN) applied to every partition.
pub fn keypad_function(action: ArmAction) -> Message {
    Message::from_array([PRIMARY_KEYPAD_FUNCTION, action.code(), ALL_PARTITIONS])
}

/// Positive acknowledgment.
pub fn ack() -> Message {
    fixed(ACK)
}

/// Negative acknowledgment.
pub fn nak() -> Message {
    fixed(NAK)
}

/// Set the panel clock.
///
/// Layout: year - 2000, month, day, hour, minute, ISO weekday (Monday = 1).
pub fn set_clock(at: &NaiveDateTime) -> Result<Message> {
    let year = at
        .year()
        .checked_sub(2000)
        .and_then(|y| u8::try_from(y).ok())
        .ok_or_else(|| {
            PanelError::InvalidClock(format!("year {} outside 2000..=2255", at.year()))
        })?;
    build(vec![
        SET_CLOCK,
        year,
        at.month() as u8,
        at.day() as u8,
        at.hour() as u8,
        at.minute() as u8,
        at.weekday().number_from_monday() as u8,
    ])
}

fn fixed(type_byte: u8) -> Message {
    Message::from_array([type_byte])
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use nx584_frame::{encode_frame, hex};

    use super::*;

    fn wire(message: &Message) -> String {
        let mut buf = bytes::BytesMut::new();
        encode_frame(message.as_bytes(), &mut buf).unwrap();
        hex(&buf)
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn zone_status_for_zone_one() {
        assert_eq!(wire(&zone_status(1).unwrap()), "7E 02 24 00 26 4E");
    }

    #[test]
    fn numbers_are_sent_zero_based() {
        assert_eq!(zone_name(16).unwrap().as_bytes(), &[0x23, 0x0F]);
        assert_eq!(zone_status(256).unwrap().as_bytes(), &[0x24, 0xFF]);
        assert_eq!(partition_status(8).unwrap().as_bytes(), &[0x26, 0x07]);
        assert_eq!(user_info(3).unwrap().as_bytes(), &[0x33, 0x03]);
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        assert!(matches!(zone_status(0), Err(PanelError::InvalidArgument(_))));
        assert!(matches!(zone_name(257), Err(PanelError::InvalidArgument(_))));
        assert!(matches!(partition_status(0), Err(PanelError::InvalidArgument(_))));
        assert!(matches!(partition_status(9), Err(PanelError::InvalidArgument(_))));
        assert!(matches!(user_info(0), Err(PanelError::InvalidArgument(_))));
    }

    #[test]
    fn keypad_functions() {
        assert_eq!(wire(&keypad_function(ArmAction::ArmAway)), "7E 03 3D 02 FF 42 C7");
        assert_eq!(keypad_function(ArmAction::AutoArm).as_bytes(), &[0x3D, 0x05, 0xFF]);
        assert_eq!("arm-stay".parse::<ArmAction>().unwrap(), ArmAction::ArmStay);
        assert!("panic".parse::<ArmAction>().is_err());
    }

    #[test]
    fn fixed_commands() {
        assert_eq!(wire(&system_status()), "7E 01 28 29 2A");
        assert_eq!(wire(&ack()), "7E 01 1D 1E 1F");
        assert_eq!(wire(&nak()), "7E 01 1E 1F 20");
        assert_eq!(partition_snapshot().as_bytes(), &[0x27]);
        assert!(ack().is_bare_ack());
    }

    #[test]
    fn set_clock_uses_iso_weekday() {
        // Saturday.
        let msg = set_clock(&at(2026, 10, 17, 14, 30)).unwrap();
        assert_eq!(msg.as_bytes(), &[0x3B, 0x1A, 0x0A, 0x11, 0x0E, 0x1E, 0x06]);
        assert!(wire(&msg).ends_with("A9 56"));

        // Thursday, leap day.
        let msg = set_clock(&at(2024, 2, 29, 23, 59)).unwrap();
        assert_eq!(msg.as_bytes(), &[0x3B, 0x18, 0x02, 0x1D, 0x17, 0x3B, 0x04]);
        assert!(wire(&msg).ends_with("CF A5"));

        // Sunday is 7.
        let msg = set_clock(&at(2026, 10, 18, 0, 0)).unwrap();
        assert_eq!(msg.as_bytes()[6], 7);
    }

    #[test]
    fn set_clock_rejects_years_outside_field() {
        assert!(matches!(
            set_clock(&at(1999, 12, 31, 23, 59)),
            Err(PanelError::InvalidClock(_))
        ));
        assert!(matches!(
            set_clock(&at(2256, 1, 1, 0, 0)),
            Err(PanelError::InvalidClock(_))
        ));
        assert!(set_clock(&at(2255, 12, 31, 0, 0)).is_ok());
    }
}
