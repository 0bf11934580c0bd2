//! Message kinds exchanged between the plugin and the driver.

use std::fmt;

use thiserror::Error;

use crate::frame::Frame;
use crate::payload::{self, PayloadError, Rgb, StatusReport};

/// Closed set of message kinds understood by this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Liveness probe sent by a client.
    Ping,
    /// Reply to [`MessageType::Ping`].
    Pong,
    /// Packed RGB triples for the device.
    SetLedColors,
    /// One little-endian `f32` in `[0, 1]`.
    SetBrightness,
    /// Request for a [`MessageType::StatusResponse`].
    GetStatus,
    /// Short JSON status object.
    StatusResponse,
}

impl MessageType {
    /// Every known message type, in code order.
    pub const ALL: [Self; 6] = [
        Self::Ping,
        Self::Pong,
        Self::SetLedColors,
        Self::SetBrightness,
        Self::GetStatus,
        Self::StatusResponse,
    ];

    /// Wire code for the type.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ping => 1,
            Self::Pong => 2,
            Self::SetLedColors => 10,
            Self::SetBrightness => 11,
            Self::GetStatus => 20,
            Self::StatusResponse => 21,
        }
    }

    /// Maps a wire code back to a type; unknown codes yield `None`.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Ping),
            2 => Some(Self::Pong),
            10 => Some(Self::SetLedColors),
            11 => Some(Self::SetBrightness),
            20 => Some(Self::GetStatus),
            21 => Some(Self::StatusResponse),
            _ => None,
        }
    }

    /// Canonical name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::SetLedColors => "set_led_colors",
            Self::SetBrightness => "set_brightness",
            Self::GetStatus => "get_status",
            Self::StatusResponse => "status_response",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Raised when a wire code does not name a known [`MessageType`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown message type code {0}")]
pub struct UnknownMessageType(pub u16);

impl TryFrom<u16> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(UnknownMessageType(code))
    }
}

/// A message with its payload decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// See [`MessageType::Ping`].
    Ping,
    /// See [`MessageType::Pong`].
    Pong,
    /// See [`MessageType::SetLedColors`].
    SetLedColors(Vec<Rgb>),
    /// See [`MessageType::SetBrightness`].
    SetBrightness(f32),
    /// See [`MessageType::GetStatus`].
    GetStatus,
    /// See [`MessageType::StatusResponse`].
    StatusResponse(StatusReport),
    /// A frame whose type code this build does not know.
    Unknown {
        /// Raw type code.
        type_code: u16,
        /// Undecoded payload.
        payload: Vec<u8>,
    },
}

impl Message {
    /// Type code carried on the wire.
    #[must_use]
    pub const fn type_code(&self) -> u16 {
        match self {
            Self::Ping => MessageType::Ping.code(),
            Self::Pong => MessageType::Pong.code(),
            Self::SetLedColors(_) => MessageType::SetLedColors.code(),
            Self::SetBrightness(_) => MessageType::SetBrightness.code(),
            Self::GetStatus => MessageType::GetStatus.code(),
            Self::StatusResponse(_) => MessageType::StatusResponse.code(),
            Self::Unknown { type_code, .. } => *type_code,
        }
    }

    /// Builds the frame that carries this message.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Status`] if a status report fails to serialise.
    pub fn to_frame(&self) -> Result<Frame, PayloadError> {
        let payload = match self {
            Self::Ping | Self::Pong | Self::GetStatus => Vec::new(),
            Self::SetLedColors(colors) => payload::encode_colors(colors),
            Self::SetBrightness(value) => payload::encode_brightness(*value).to_vec(),
            Self::StatusResponse(report) => report.to_payload()?,
            Self::Unknown { payload, .. } => payload.clone(),
        };
        Ok(Frame::new(self.type_code(), payload))
    }

    /// Encodes the message straight to wire bytes.
    ///
    /// # Errors
    ///
    /// Fails when the payload cannot be built or exceeds the frame limit.
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        let frame = self.to_frame()?;
        frame.encode().map_err(PayloadError::from)
    }

    /// Interprets a decoded frame.
    ///
    /// Colour payloads ignore any trailing partial triple. Unknown codes are
    /// preserved as [`Message::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::TruncatedBrightness`] for brightness payloads
    /// shorter than four bytes and [`PayloadError::Status`] for status text
    /// that is not a valid report.
    pub fn from_frame(frame: Frame) -> Result<Self, PayloadError> {
        let Some(kind) = frame.message_type() else {
            return Ok(Self::Unknown {
                type_code: frame.type_code(),
                payload: frame.into_payload(),
            });
        };
        let message = match kind {
            MessageType::Ping => Self::Ping,
            MessageType::Pong => Self::Pong,
            MessageType::GetStatus => Self::GetStatus,
            MessageType::SetLedColors => Self::SetLedColors(payload::decode_colors(frame.payload())),
            MessageType::SetBrightness => {
                let value = payload::decode_brightness(frame.payload()).ok_or(
                    PayloadError::TruncatedBrightness {
                        len: frame.payload().len(),
                    },
                )?;
                Self::SetBrightness(value)
            }
            MessageType::StatusResponse => {
                Self::StatusResponse(StatusReport::from_payload(frame.payload())?)
            }
        };
        Ok(message)
    }
}
