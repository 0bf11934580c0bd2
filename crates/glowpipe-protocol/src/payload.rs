//! Payload layouts for the known message types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::FrameError;

/// Bytes per packed RGB triple.
pub const RGB_TRIPLE_LEN: usize = 3;

/// Bytes in a brightness payload.
pub const BRIGHTNESS_LEN: usize = 4;

/// Errors raised while building or interpreting payloads.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Brightness payload too short to hold an `f32`.
    #[error("brightness payload has {len} bytes, expected {BRIGHTNESS_LEN}")]
    TruncatedBrightness {
        /// Length of the payload received.
        len: usize,
    },
    /// Status text could not be (de)serialised.
    #[error("invalid status payload: {source}")]
    Status {
        /// Underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
    /// The payload does not fit in a frame.
    #[error("cannot frame payload: {source}")]
    Frame {
        /// Underlying codec error.
        #[source]
        source: FrameError,
    },
}

impl From<FrameError> for PayloadError {
    fn from(source: FrameError) -> Self {
        Self::Frame { source }
    }
}

/// One 8-bit-per-channel colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Builds a colour from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Raised when a colour string is not six hex digits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid colour '{0}', expected RRGGBB")]
pub struct RgbParseError(pub String);

impl FromStr for Rgb {
    type Err = RgbParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let digits = input.strip_prefix('#').unwrap_or(input);
        let invalid = || RgbParseError(input.to_owned());
        if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(&invalid)
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Packs colours as consecutive `r, g, b` bytes.
#[must_use]
pub fn encode_colors(colors: &[Rgb]) -> Vec<u8> {
    colors
        .iter()
        .flat_map(|colour| [colour.r, colour.g, colour.b])
        .collect()
}

/// Unpacks RGB triples; a trailing partial triple is ignored.
#[must_use]
pub fn decode_colors(payload: &[u8]) -> Vec<Rgb> {
    payload
        .chunks_exact(RGB_TRIPLE_LEN)
        .filter_map(|triple| match *triple {
            [r, g, b] => Some(Rgb::new(r, g, b)),
            _ => None,
        })
        .collect()
}

/// Encodes a brightness level as a little-endian `f32`.
#[must_use]
pub fn encode_brightness(value: f32) -> [u8; BRIGHTNESS_LEN] {
    value.to_le_bytes()
}

/// Reads the brightness level from the first four payload bytes.
///
/// Shorter payloads yield `None`; extra bytes are ignored.
#[must_use]
pub fn decode_brightness(payload: &[u8]) -> Option<f32> {
    payload
        .first_chunk::<BRIGHTNESS_LEN>()
        .map(|bytes| f32::from_le_bytes(*bytes))
}

/// Status object carried by a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Overall driver state, `"ok"` while serving.
    pub status: String,
    /// Clients connected when the report was produced.
    pub connected_clients: usize,
}

impl StatusReport {
    /// Report for a healthy driver.
    #[must_use]
    pub fn ok(connected_clients: usize) -> Self {
        Self {
            status: "ok".to_owned(),
            connected_clients,
        }
    }

    /// Serialises the report as compact JSON text.
    ///
    /// # Errors
    ///
    /// Propagates serialisation failures as [`PayloadError::Status`].
    pub fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a report from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Status`] when the text is not a report.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(payload)?)
    }
}
