// MIT License - Copyright (c) 2026 Peter Wright
// RainBird LAN protocol errors

use crate::protocol::DecodeError;

/// All errors that can occur in the rainbird-lan-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum RainbirdError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {status}")]
    HttpStatus { status: u16 },

    #[error("Crypto error: {details}")]
    Crypto { details: String },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response has no result")]
    MissingResult,

    #[error("Malformed hex payload: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Controller rejected request: {message} (code {code})")]
    Rpc { code: i64, message: String },

    #[error("Undecodable reply: {0}")]
    Decode(#[from] DecodeError),

    #[error("Command 0x{command:02X} not acknowledged (code {code})")]
    NotAcknowledged { command: u8, code: u8 },

    #[error("Unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply { expected: &'static str, got: String },

    #[error("Unknown zone: {zone}")]
    InvalidZone { zone: u8 },

    #[error("Invalid program identifier: {id:?}")]
    InvalidProgram { id: String },

    #[error("Zone {zone} is disabled")]
    ZoneDisabled { zone: u8 },

    #[error("Channel closed")]
    ChannelClosed,
}

impl RainbirdError {
    /// Whether this is a transport-level failure that should be retried.
    ///
    /// An explicit JSON-RPC error means the controller understood and
    /// rejected the request, so it is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RainbirdError::Http(_)
                | RainbirdError::HttpStatus { .. }
                | RainbirdError::Crypto { .. }
                | RainbirdError::Json(_)
                | RainbirdError::MissingResult
                | RainbirdError::Hex(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RainbirdError>;
