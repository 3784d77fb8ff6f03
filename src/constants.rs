// MIT License - Copyright (c) 2026 Peter Wright
// RainBird LAN protocol constants

use std::time::Duration;

/// Request opcodes (first byte of a command frame).
pub mod request {
    pub const MODEL_AND_VERSION: u8 = 0x02;
    pub const AVAILABLE_ZONES: u8 = 0x03;
    pub const SERIAL_NUMBER: u8 = 0x05;
    pub const CONTROLLER_TIME_GET: u8 = 0x10;
    pub const CONTROLLER_TIME_SET: u8 = 0x11;
    pub const CONTROLLER_DATE_GET: u8 = 0x12;
    pub const CONTROLLER_DATE_SET: u8 = 0x13;
    pub const IRRIGATION_DELAY_GET: u8 = 0x36;
    pub const IRRIGATION_DELAY_SET: u8 = 0x37;
    pub const RUN_PROGRAM: u8 = 0x38;
    pub const RUN_ZONE: u8 = 0x39;
    pub const CURRENT_ZONE_STATE: u8 = 0x3B;
    pub const RAIN_SENSOR_STATE: u8 = 0x3E;
    pub const CURRENT_ZONE: u8 = 0x3F;
    pub const STOP_IRRIGATION: u8 = 0x40;
    pub const ADVANCE_ZONE: u8 = 0x42;
    pub const IRRIGATION_STATE: u8 = 0x48;
    pub const CONTROLLER_STATE: u8 = 0x4C;
}

/// Reply opcodes (first byte of a decrypted response payload).
pub mod reply {
    pub const NOT_ACKNOWLEDGED: u8 = 0x00;
    pub const ACKNOWLEDGED: u8 = 0x01;
    pub const MODEL_AND_VERSION: u8 = 0x82;
    pub const AVAILABLE_ZONES: u8 = 0x83;
    pub const SERIAL_NUMBER: u8 = 0x85;
    pub const CONTROLLER_TIME: u8 = 0x90;
    pub const CONTROLLER_DATE: u8 = 0x92;
    pub const IRRIGATION_DELAY: u8 = 0xB6;
    pub const CURRENT_ZONE_STATE: u8 = 0xBB;
    pub const RAIN_SENSOR_STATE: u8 = 0xBE;
    pub const CURRENT_ZONE: u8 = 0xBF;
    pub const IRRIGATION_STATE: u8 = 0xC8;
    pub const CONTROLLER_STATE: u8 = 0xCC;
}

/// Program code meaning "no program running".
pub const NO_PROGRAM: u8 = 255;

/// AES block size and the fixed pad byte used by the controller.
pub const BLOCK_SIZE: usize = 16;
pub const PAD_BYTE: u8 = 0x10;

/// Trailer appended to the request text before padding.
pub const REQUEST_TRAILER: [u8; 2] = [0x00, 0x10];

/// Wire body layout: `hash(32) ‖ iv(16) ‖ ciphertext`.
pub const HASH_LEN: usize = 32;
pub const IV_LEN: usize = 16;

/// JSON-RPC envelope constants.
pub const RPC_ID: u64 = 9;
pub const RPC_VERSION: &str = "2.0";
pub const RPC_METHOD: &str = "tunnelSip";

/// HTTP endpoint path and fixed request headers.
pub const STICK_PATH: &str = "/stick";
pub const CONTENT_TYPE: &str = "application/octet-stream";
pub const USER_AGENT: &str = "RainBird/2.0 CFNetwork/811.5.4 Darwin/16.7.0";

/// Default delay between attempts when the controller cannot be reached.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Quiet window used to coalesce refresh requests.
pub const DEFAULT_REFRESH_DEBOUNCE: Duration = Duration::from_secs(1);

/// Safety net for a hung zone start job.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default status poll interval.
pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_secs(60);

/// Clock drift beyond which a warning is logged at startup.
pub const DEFAULT_MAX_CLOCK_DRIFT: Duration = Duration::from_secs(300);

/// Known controller hardware models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerModel {
    EspRzxe,
    EspMe,
    St8xWifi,
    St8xWifi2,
    EspMe3,
    EspTm2,
    TbosBt,
    EspRzxe2,
    Arc8,
}

impl ControllerModel {
    /// Look up a model by the number reported in the ModelAndVersion reply.
    pub fn from_number(number: u16) -> Option<Self> {
        match number {
            0x0003 => Some(Self::EspRzxe),
            0x0005 | 0x0007 | 0x0107 => Some(Self::EspMe),
            0x0006 => Some(Self::St8xWifi),
            0x0008 => Some(Self::St8xWifi2),
            0x0009 => Some(Self::EspMe3),
            0x000A | 0x010A => Some(Self::EspTm2),
            0x0099 | 0x0100 => Some(Self::TbosBt),
            0x0103 => Some(Self::EspRzxe2),
            0x0812 => Some(Self::Arc8),
            _ => None,
        }
    }

    /// Human-readable model name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EspRzxe => "ESP-RZXe",
            Self::EspMe => "ESP-Me",
            Self::St8xWifi => "ST8x-WiFi",
            Self::St8xWifi2 => "ST8x-WiFi2",
            Self::EspMe3 => "ESP-ME3",
            Self::EspTm2 => "ESP-TM2",
            Self::TbosBt => "TBOS-BT",
            Self::EspRzxe2 => "ESP-RZXe2",
            Self::Arc8 => "ARC8",
        }
    }
}

/// Model name for a model number, falling back to a hex label.
pub fn model_name(number: u16) -> String {
    match ControllerModel::from_number(number) {
        Some(model) => model.name().to_string(),
        None => format!("Unknown (0x{:04X})", number),
    }
}
