// MIT License - Copyright (c) 2026 Peter Wright
// RainBird SIP command/reply codec

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::constants::{reply, request, NO_PROGRAM};

/// Commands that can be sent to the controller.
///
/// Every command serializes to `[opcode, field bytes...]`. Multi-byte
/// integers are big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `02` — Query model number and protocol revision.
    ModelAndVersionGet,
    /// `03 <page>` — Query the bitmask of installed zones.
    AvailableZonesGet { page: u8 },
    /// `05` — Query the serial number.
    SerialNumberGet,
    /// `10` — Query the controller clock time.
    ControllerTimeGet,
    /// `11 <hour> <minute> <second>` — Set the controller clock time.
    ControllerTimeSet { hour: u8, minute: u8, second: u8 },
    /// `12` — Query the controller date.
    ControllerDateGet,
    /// `13 <day> <month*4096 + year: u16>` — Set the controller date.
    ControllerDateSet { year: u16, month: u8, day: u8 },
    /// `36` — Query the rain delay in days.
    IrrigationDelayGet,
    /// `37 <days: u16>` — Set the rain delay in days.
    IrrigationDelaySet { days: u16 },
    /// `38 <program>` — Start a stored program (0 = A).
    RunProgram { program: u8 },
    /// `39 <zone: u16> <minutes>` — Manually run a zone.
    ///
    /// The wire carries whole minutes; see [`Command::run_zone`].
    RunZone { zone: u8, minutes: u8 },
    /// `3B <page>` — Query the running zone with remaining time.
    /// Not supported by older firmware.
    CurrentZoneStateGet { page: u8 },
    /// `3E` — Query the rain sensor.
    RainSensorStateGet,
    /// `3F <page>` — Query the bitmask of the running zone.
    CurrentZoneGet { page: u8 },
    /// `40` — Stop all irrigation.
    StopIrrigation,
    /// `42 00` — Advance to the next queued zone.
    /// Not supported by all firmware.
    AdvanceZone,
    /// `48` — Query whether irrigation is enabled.
    IrrigationStateGet,
    /// `4C` — Query the combined controller state.
    ControllerStateGet,
    /// Raw frame for opcodes without a typed variant (e.g. the older `4B`
    /// controller state query).
    Raw(Vec<u8>),
}

impl Command {
    /// Build a run-zone command from a duration in seconds.
    ///
    /// The duration is rounded to the nearest whole minute and clamped to
    /// 1..=255, so sub-minute requests run for one minute.
    pub fn run_zone(zone: u8, duration_secs: u32) -> Self {
        Command::RunZone {
            zone,
            minutes: duration_to_minutes(duration_secs),
        }
    }

    /// The leading opcode byte.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::ModelAndVersionGet => request::MODEL_AND_VERSION,
            Command::AvailableZonesGet { .. } => request::AVAILABLE_ZONES,
            Command::SerialNumberGet => request::SERIAL_NUMBER,
            Command::ControllerTimeGet => request::CONTROLLER_TIME_GET,
            Command::ControllerTimeSet { .. } => request::CONTROLLER_TIME_SET,
            Command::ControllerDateGet => request::CONTROLLER_DATE_GET,
            Command::ControllerDateSet { .. } => request::CONTROLLER_DATE_SET,
            Command::IrrigationDelayGet => request::IRRIGATION_DELAY_GET,
            Command::IrrigationDelaySet { .. } => request::IRRIGATION_DELAY_SET,
            Command::RunProgram { .. } => request::RUN_PROGRAM,
            Command::RunZone { .. } => request::RUN_ZONE,
            Command::CurrentZoneStateGet { .. } => request::CURRENT_ZONE_STATE,
            Command::RainSensorStateGet => request::RAIN_SENSOR_STATE,
            Command::CurrentZoneGet { .. } => request::CURRENT_ZONE,
            Command::StopIrrigation => request::STOP_IRRIGATION,
            Command::AdvanceZone => request::ADVANCE_ZONE,
            Command::IrrigationStateGet => request::IRRIGATION_STATE,
            Command::ControllerStateGet => request::CONTROLLER_STATE,
            Command::Raw(bytes) => bytes.first().copied().unwrap_or_default(),
        }
    }

    /// Serialize the command to its binary frame.
    pub fn encode(&self) -> Vec<u8> {
        let op = self.opcode();
        match self {
            Command::AvailableZonesGet { page }
            | Command::CurrentZoneStateGet { page }
            | Command::CurrentZoneGet { page } => vec![op, *page],
            Command::ControllerTimeSet {
                hour,
                minute,
                second,
            } => vec![op, *hour, *minute, *second],
            Command::ControllerDateSet { year, month, day } => {
                let packed = (*month as u16) * 4096 + (*year & 0x0FFF);
                let [hi, lo] = packed.to_be_bytes();
                vec![op, *day, hi, lo]
            }
            Command::IrrigationDelaySet { days } => {
                let [hi, lo] = days.to_be_bytes();
                vec![op, hi, lo]
            }
            Command::RunProgram { program } => vec![op, *program],
            Command::RunZone { zone, minutes } => {
                let [hi, lo] = (*zone as u16).to_be_bytes();
                vec![op, hi, lo, *minutes]
            }
            Command::AdvanceZone => vec![op, 0x00],
            Command::Raw(bytes) => bytes.clone(),
            Command::ModelAndVersionGet
            | Command::SerialNumberGet
            | Command::ControllerTimeGet
            | Command::ControllerDateGet
            | Command::IrrigationDelayGet
            | Command::RainSensorStateGet
            | Command::StopIrrigation
            | Command::IrrigationStateGet
            | Command::ControllerStateGet => vec![op],
        }
    }
}

/// Round a duration in seconds to whole minutes for the run-zone frame.
pub fn duration_to_minutes(duration_secs: u32) -> u8 {
    let minutes = duration_secs.saturating_add(30) / 60;
    minutes.clamp(1, u8::MAX as u32) as u8
}

/// Errors produced when a reply frame has a shape the codec cannot read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty reply")]
    Empty,

    #[error("reply 0x{opcode:02X} too short: expected {expected} bytes, got {actual}")]
    Truncated {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("reply 0x{opcode:02X} has unsupported length {actual}")]
    UnsupportedLayout { opcode: u8, actual: usize },
}

/// Raw date/time fields as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ControllerClock {
    /// Convert to a calendar date/time. Returns `None` when the controller
    /// reports an impossible date (e.g. month 0).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_opt(self.hour as u32, self.minute as u32, self.second as u32)
    }
}

/// The two known CurrentZoneState layouts, distinguished by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStateLayout {
    /// 12-byte frame:
    /// `BB page program zone time:u16 _ running _ _ _ _`
    Extended,
    /// 10-byte frame:
    /// `BB page running program _ _ zone _ time:u16`
    Compact,
}

/// Decoded CurrentZoneState reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStateReport {
    pub page: u8,
    /// Running zone, 0 when idle.
    pub zone_id: u8,
    pub time_remaining_secs: u16,
    pub running: bool,
    /// Program code, [`NO_PROGRAM`] when none.
    pub program: u8,
    pub layout: ZoneStateLayout,
}

/// Decoded ControllerState reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStateReport {
    pub clock: ControllerClock,
    pub delay_days: u16,
    pub rain_set_point_reached: bool,
    pub irrigation_enabled: bool,
    pub seasonal_adjust_percent: u16,
    pub current_zone_time_remaining_secs: u16,
    pub current_zone: u8,
}

/// Replies received from the controller, keyed by their first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Acknowledged { command: u8 },
    NotAcknowledged { command: u8, code: u8 },
    ModelAndVersion {
        model_number: u16,
        model_name: String,
        version: String,
    },
    AvailableZones { page: u8, zones: BTreeSet<u8> },
    SerialNumber { serial: String },
    CurrentZoneState(ZoneStateReport),
    ControllerState(ControllerStateReport),
    RainSensorState { set_point_reached: bool },
    IrrigationState { enabled: bool },
    IrrigationDelay { days: u16 },
    ControllerDate { year: u16, month: u8, day: u8 },
    ControllerTime { hour: u8, minute: u8, second: u8 },
    CurrentZone { page: u8, zone_id: u8 },
    /// An opcode the codec does not know. Callers may ignore it.
    Unknown { opcode: u8, payload: Vec<u8> },
}

impl Reply {
    /// Decode a decrypted payload, dispatching on its first byte.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let Some(&opcode) = payload.first() else {
            return Err(DecodeError::Empty);
        };
        let p = payload;

        let decoded = match opcode {
            reply::NOT_ACKNOWLEDGED => {
                require(p, 3)?;
                Reply::NotAcknowledged {
                    command: p[1],
                    code: p[2],
                }
            }
            reply::ACKNOWLEDGED => {
                require(p, 2)?;
                Reply::Acknowledged { command: p[1] }
            }
            reply::MODEL_AND_VERSION => {
                require(p, 5)?;
                let model_number = u16::from_be_bytes([p[1], p[2]]);
                Reply::ModelAndVersion {
                    model_number,
                    model_name: crate::constants::model_name(model_number),
                    version: format!("{}.{}", p[3], p[4]),
                }
            }
            reply::AVAILABLE_ZONES => {
                require(p, 6)?;
                Reply::AvailableZones {
                    page: p[1],
                    zones: zones_from_mask(read_mask(&p[2..6])),
                }
            }
            reply::SERIAL_NUMBER => {
                require(p, 2)?;
                Reply::SerialNumber {
                    serial: hex::encode_upper(&p[1..]),
                }
            }
            reply::CONTROLLER_TIME => {
                require(p, 4)?;
                Reply::ControllerTime {
                    hour: p[1],
                    minute: p[2],
                    second: p[3],
                }
            }
            reply::CONTROLLER_DATE => {
                require(p, 4)?;
                let (month, year) = unpack_month_year(p[2], p[3]);
                Reply::ControllerDate {
                    year,
                    month,
                    day: p[1],
                }
            }
            reply::IRRIGATION_DELAY => {
                require(p, 3)?;
                Reply::IrrigationDelay {
                    days: u16::from_be_bytes([p[1], p[2]]),
                }
            }
            reply::CURRENT_ZONE_STATE => Reply::CurrentZoneState(decode_zone_state(p)?),
            reply::RAIN_SENSOR_STATE => {
                require(p, 2)?;
                Reply::RainSensorState {
                    set_point_reached: p[1] != 0,
                }
            }
            reply::CURRENT_ZONE => {
                require(p, 6)?;
                Reply::CurrentZone {
                    page: p[1],
                    zone_id: zone_from_mask(read_mask(&p[2..6])),
                }
            }
            reply::IRRIGATION_STATE => {
                require(p, 2)?;
                Reply::IrrigationState { enabled: p[1] != 0 }
            }
            reply::CONTROLLER_STATE => {
                require(p, 16)?;
                let (month, year) = unpack_month_year(p[5], p[6]);
                Reply::ControllerState(ControllerStateReport {
                    clock: ControllerClock {
                        year,
                        month,
                        day: p[4],
                        hour: p[1],
                        minute: p[2],
                        second: p[3],
                    },
                    delay_days: u16::from_be_bytes([p[7], p[8]]),
                    rain_set_point_reached: p[9] != 0,
                    irrigation_enabled: p[10] != 0,
                    seasonal_adjust_percent: u16::from_be_bytes([p[11], p[12]]),
                    current_zone_time_remaining_secs: u16::from_be_bytes([p[13], p[14]]),
                    current_zone: p[15],
                })
            }
            _ => Reply::Unknown {
                opcode,
                payload: payload.to_vec(),
            },
        };

        Ok(decoded)
    }

    /// Short name of the reply variant, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Reply::Acknowledged { .. } => "Acknowledged",
            Reply::NotAcknowledged { .. } => "NotAcknowledged",
            Reply::ModelAndVersion { .. } => "ModelAndVersion",
            Reply::AvailableZones { .. } => "AvailableZones",
            Reply::SerialNumber { .. } => "SerialNumber",
            Reply::CurrentZoneState(_) => "CurrentZoneState",
            Reply::ControllerState(_) => "ControllerState",
            Reply::RainSensorState { .. } => "RainSensorState",
            Reply::IrrigationState { .. } => "IrrigationState",
            Reply::IrrigationDelay { .. } => "IrrigationDelay",
            Reply::ControllerDate { .. } => "ControllerDate",
            Reply::ControllerTime { .. } => "ControllerTime",
            Reply::CurrentZone { .. } => "CurrentZone",
            Reply::Unknown { .. } => "Unknown",
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Unknown { opcode, .. } => write!(f, "Unknown(0x{:02X})", opcode),
            Reply::NotAcknowledged { command, code } => {
                write!(f, "NotAcknowledged(0x{:02X}, {})", command, code)
            }
            other => f.write_str(other.name()),
        }
    }
}

fn require(payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() < expected {
        return Err(DecodeError::Truncated {
            opcode: payload[0],
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn read_mask(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Split the packed `month*4096 + year` field.
fn unpack_month_year(hi: u8, lo: u8) -> (u8, u16) {
    let packed = u16::from_be_bytes([hi, lo]);
    ((packed >> 12) as u8, packed & 0x0FFF)
}

fn decode_zone_state(p: &[u8]) -> Result<ZoneStateReport, DecodeError> {
    match p.len() {
        12 => Ok(ZoneStateReport {
            page: p[1],
            program: p[2],
            zone_id: p[3],
            time_remaining_secs: u16::from_be_bytes([p[4], p[5]]),
            running: p[7] != 0,
            layout: ZoneStateLayout::Extended,
        }),
        10 => Ok(ZoneStateReport {
            page: p[1],
            running: p[2] != 0,
            program: p[3],
            zone_id: p[6],
            time_remaining_secs: u16::from_be_bytes([p[8], p[9]]),
            layout: ZoneStateLayout::Compact,
        }),
        actual => Err(DecodeError::UnsupportedLayout {
            opcode: p[0],
            actual,
        }),
    }
}

/// Zone numbers from a little-endian zone bitmask (bit 0 = zone 1).
pub fn zones_from_mask(mask: u32) -> BTreeSet<u8> {
    (0..32u8).filter(|bit| mask & (1 << bit) != 0).map(|bit| bit + 1).collect()
}

/// Bitmask for a set of zone numbers (inverse of [`zones_from_mask`]).
pub fn zone_mask(zones: &BTreeSet<u8>) -> u32 {
    zones
        .iter()
        .filter(|z| (1..=32).contains(*z))
        .fold(0, |mask, z| mask | (1 << (z - 1)))
}

/// The running zone encoded in a CurrentZone bitmask, 0 when none is set.
pub fn zone_from_mask(mask: u32) -> u8 {
    if mask == 0 {
        0
    } else {
        mask.ilog2() as u8 + 1
    }
}

/// Program letter for a numeric program code: 0 → "A", 25 → "Z".
/// [`NO_PROGRAM`] and codes outside A–Z map to the empty string.
pub fn program_id(code: u8) -> String {
    if code == NO_PROGRAM || code >= 26 {
        return String::new();
    }
    char::from(b'A' + code).to_string()
}

/// Numeric program code for a single-letter program identifier.
pub fn program_number(id: &str) -> Option<u8> {
    let mut chars = id.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some(c.to_ascii_uppercase() as u8 - b'A')
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frames() {
        assert_eq!(Command::ModelAndVersionGet.encode(), vec![0x02]);
        assert_eq!(Command::AvailableZonesGet { page: 0 }.encode(), vec![0x03, 0x00]);
        assert_eq!(Command::SerialNumberGet.encode(), vec![0x05]);
        assert_eq!(Command::StopIrrigation.encode(), vec![0x40]);
        assert_eq!(Command::AdvanceZone.encode(), vec![0x42, 0x00]);
        assert_eq!(Command::RunProgram { program: 2 }.encode(), vec![0x38, 0x02]);
        assert_eq!(Command::CurrentZoneStateGet { page: 0 }.encode(), vec![0x3B, 0x00]);
        assert_eq!(Command::ControllerStateGet.encode(), vec![0x4C]);
        assert_eq!(Command::Raw(vec![0x4B]).encode(), vec![0x4B]);
        assert_eq!(Command::Raw(vec![0x4B]).opcode(), 0x4B);
    }

    #[test]
    fn test_run_zone_frame() {
        assert_eq!(
            Command::RunZone { zone: 3, minutes: 5 }.encode(),
            vec![0x39, 0x00, 0x03, 0x05]
        );
        assert_eq!(Command::run_zone(3, 300), Command::RunZone { zone: 3, minutes: 5 });
    }

    #[test]
    fn test_duration_rounding() {
        assert_eq!(duration_to_minutes(300), 5);
        assert_eq!(duration_to_minutes(329), 5);
        assert_eq!(duration_to_minutes(330), 6);
        // Sub-minute requests still run for a minute
        assert_eq!(duration_to_minutes(0), 1);
        assert_eq!(duration_to_minutes(20), 1);
        assert_eq!(duration_to_minutes(u32::MAX), 255);
    }

    #[test]
    fn test_date_set_packs_month_and_year() {
        let frame = Command::ControllerDateSet {
            year: 2024,
            month: 6,
            day: 15,
        }
        .encode();
        // 6 * 4096 + 2024 = 26600 = 0x67E8
        assert_eq!(frame, vec![0x13, 15, 0x67, 0xE8]);
    }

    #[test]
    fn test_time_and_delay_set_frames() {
        assert_eq!(
            Command::ControllerTimeSet { hour: 13, minute: 45, second: 7 }.encode(),
            vec![0x11, 13, 45, 7]
        );
        assert_eq!(
            Command::IrrigationDelaySet { days: 0x0102 }.encode(),
            vec![0x37, 0x01, 0x02]
        );
    }

    #[test]
    fn test_decode_ack_and_nack() {
        assert_eq!(
            Reply::decode(&[0x01, 0x39]).unwrap(),
            Reply::Acknowledged { command: 0x39 }
        );
        assert_eq!(
            Reply::decode(&[0x00, 0x42, 0x01]).unwrap(),
            Reply::NotAcknowledged { command: 0x42, code: 1 }
        );
    }

    #[test]
    fn test_decode_model_and_version() {
        let reply = Reply::decode(&[0x82, 0x00, 0x09, 0x02, 0x0C]).unwrap();
        assert_eq!(
            reply,
            Reply::ModelAndVersion {
                model_number: 9,
                model_name: "ESP-ME3".to_string(),
                version: "2.12".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_available_zones_bitmask() {
        let reply = Reply::decode(&[0x83, 0x00, 0b101, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(
            reply,
            Reply::AvailableZones {
                page: 0,
                zones: BTreeSet::from([1, 3]),
            }
        );
    }

    #[test]
    fn test_zone_mask_is_little_endian() {
        // Zone 9 lives in the second byte
        let reply = Reply::decode(&[0x83, 0x00, 0x00, 0x01, 0x00, 0x80]).unwrap();
        let Reply::AvailableZones { zones, .. } = reply else {
            panic!("expected AvailableZones");
        };
        assert_eq!(zones, BTreeSet::from([9, 32]));
        assert_eq!(zone_mask(&zones), 0x8000_0100);
    }

    #[test]
    fn test_decode_current_zone() {
        assert_eq!(
            Reply::decode(&[0xBF, 0x00, 0b100, 0, 0, 0]).unwrap(),
            Reply::CurrentZone { page: 0, zone_id: 3 }
        );
        assert_eq!(
            Reply::decode(&[0xBF, 0x00, 0, 0, 0, 0]).unwrap(),
            Reply::CurrentZone { page: 0, zone_id: 0 }
        );
        assert_eq!(zone_from_mask(1), 1);
        assert_eq!(zone_from_mask(1 << 31), 32);
    }

    #[test]
    fn test_decode_serial_number() {
        let reply = Reply::decode(&[0x85, 0x00, 0x00, 0x12, 0xAB, 0x34, 0x56, 0x78, 0x9A]).unwrap();
        assert_eq!(
            reply,
            Reply::SerialNumber {
                serial: "000012AB3456789A".to_string()
            }
        );
    }

    #[test]
    fn test_decode_date_and_time() {
        assert_eq!(
            Reply::decode(&[0x92, 15, 0x67, 0xE8]).unwrap(),
            Reply::ControllerDate { year: 2024, month: 6, day: 15 }
        );
        assert_eq!(
            Reply::decode(&[0x90, 23, 59, 1]).unwrap(),
            Reply::ControllerTime { hour: 23, minute: 59, second: 1 }
        );
    }

    #[test]
    fn test_decode_simple_states() {
        assert_eq!(
            Reply::decode(&[0xBE, 0x01]).unwrap(),
            Reply::RainSensorState { set_point_reached: true }
        );
        assert_eq!(
            Reply::decode(&[0xC8, 0x00]).unwrap(),
            Reply::IrrigationState { enabled: false }
        );
        assert_eq!(
            Reply::decode(&[0xB6, 0x00, 0x03]).unwrap(),
            Reply::IrrigationDelay { days: 3 }
        );
    }

    #[test]
    fn test_decode_zone_state_extended_layout() {
        let frame = [0xBB, 0x00, 0x01, 0x04, 0x01, 0x2C, 0x00, 0x01, 0, 0, 0, 0];
        let Reply::CurrentZoneState(report) = Reply::decode(&frame).unwrap() else {
            panic!("expected CurrentZoneState");
        };
        assert_eq!(report.layout, ZoneStateLayout::Extended);
        assert_eq!(report.zone_id, 4);
        assert_eq!(report.time_remaining_secs, 300);
        assert!(report.running);
        assert_eq!(report.program, 1);
    }

    #[test]
    fn test_decode_zone_state_compact_layout() {
        let frame = [0xBB, 0x00, 0x01, 0xFF, 0x00, 0x00, 0x07, 0x00, 0x00, 0x5A];
        let Reply::CurrentZoneState(report) = Reply::decode(&frame).unwrap() else {
            panic!("expected CurrentZoneState");
        };
        assert_eq!(report.layout, ZoneStateLayout::Compact);
        assert_eq!(report.zone_id, 7);
        assert_eq!(report.time_remaining_secs, 90);
        assert!(report.running);
        assert_eq!(report.program, NO_PROGRAM);
    }

    #[test]
    fn test_decode_zone_state_rejects_other_lengths() {
        let err = Reply::decode(&[0xBB, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
            .unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedLayout { opcode: 0xBB, actual: 11 });
    }

    #[test]
    fn test_decode_controller_state() {
        let frame = [
            0xCC, 14, 30, 5, // 14:30:05
            21, 0x37, 0xE8, // 21 March 2024
            0x00, 0x02, // 2 delay days
            0x01, 0x01, // rain set point, irrigation enabled
            0x00, 0x64, // 100%
            0x00, 0x78, // 120 s remaining
            0x02, // zone 2
        ];
        let Reply::ControllerState(state) = Reply::decode(&frame).unwrap() else {
            panic!("expected ControllerState");
        };
        assert_eq!(state.clock.month, 3);
        assert_eq!(state.clock.year, 2024);
        assert_eq!(
            state.clock.to_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 21).and_then(|d| d.and_hms_opt(14, 30, 5))
        );
        assert_eq!(state.delay_days, 2);
        assert!(state.rain_set_point_reached);
        assert!(state.irrigation_enabled);
        assert_eq!(state.seasonal_adjust_percent, 100);
        assert_eq!(state.current_zone_time_remaining_secs, 120);
        assert_eq!(state.current_zone, 2);
    }

    #[test]
    fn test_invalid_clock_has_no_naive_time() {
        let clock = ControllerClock { year: 2024, month: 0, day: 1, ..Default::default() };
        assert!(clock.to_naive().is_none());
    }

    #[test]
    fn test_decode_unknown_and_errors() {
        assert_eq!(
            Reply::decode(&[0xEE, 0x01]).unwrap(),
            Reply::Unknown { opcode: 0xEE, payload: vec![0xEE, 0x01] }
        );
        assert_eq!(Reply::decode(&[]).unwrap_err(), DecodeError::Empty);
        assert_eq!(
            Reply::decode(&[0x82, 0x00]).unwrap_err(),
            DecodeError::Truncated { opcode: 0x82, expected: 5, actual: 2 }
        );
    }

    #[test]
    fn test_program_id_mapping() {
        assert_eq!(program_id(0), "A");
        assert_eq!(program_id(25), "Z");
        assert_eq!(program_id(255), "");
        assert_eq!(program_id(26), "");
        assert_eq!(program_number("A"), Some(0));
        assert_eq!(program_number("c"), Some(2));
        assert_eq!(program_number("Z"), Some(25));
        assert_eq!(program_number(""), None);
        assert_eq!(program_number("AB"), None);
        assert_eq!(program_number("1"), None);
        for code in 0..26 {
            assert_eq!(program_number(&program_id(code)), Some(code));
        }
    }
}
