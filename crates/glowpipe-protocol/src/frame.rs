//! Length-prefixed frame codec.
//!
//! Encoding is a pure function of the type code and payload. Decoding works on
//! a borrowed view of a receive buffer and reports how many bytes the caller
//! should consume, so one read that carries several frames can be drained by
//! calling [`try_decode`] repeatedly.

use thiserror::Error;

use crate::message::MessageType;

/// Width of the little-endian length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Width of the little-endian type code.
pub const TYPE_CODE_LEN: usize = 2;

/// Bytes required before the length and type code can be read.
pub const HEADER_LEN: usize = LENGTH_PREFIX_LEN + TYPE_CODE_LEN;

/// Largest payload whose frame length still fits the 32-bit prefix.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize - TYPE_CODE_LEN;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The payload cannot be described by the 32-bit length prefix.
    #[error("payload of {len} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Largest payload the prefix can describe.
        max: usize,
    },
    /// The length prefix is too small to hold a type code.
    #[error("frame length {length} cannot hold a type code")]
    MalformedLength {
        /// Length value read from the prefix.
        length: u32,
    },
}

/// Encodes one frame into a freshly allocated buffer.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] when `2 + payload.len()` does not
/// fit in a `u32`.
///
/// # Examples
///
/// ```
/// let frame = glowpipe_protocol::encode(1, &[]).expect("ping fits");
/// assert_eq!(frame, [2, 0, 0, 0, 1, 0]);
/// ```
pub fn encode(type_code: u16, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut frame = Vec::with_capacity(HEADER_LEN.saturating_add(payload.len()));
    encode_into(&mut frame, type_code, payload)?;
    Ok(frame)
}

/// Appends one encoded frame to `buffer`.
///
/// Nothing is written when the payload is rejected.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] when the payload exceeds
/// [`MAX_PAYLOAD_LEN`].
pub fn encode_into(buffer: &mut Vec<u8>, type_code: u16, payload: &[u8]) -> Result<(), FrameError> {
    let length = frame_length(payload.len())?;
    buffer.reserve(HEADER_LEN.saturating_add(payload.len()));
    buffer.extend_from_slice(&length.to_le_bytes());
    buffer.extend_from_slice(&type_code.to_le_bytes());
    buffer.extend_from_slice(payload);
    Ok(())
}

fn frame_length(payload_len: usize) -> Result<u32, FrameError> {
    payload_len
        .checked_add(TYPE_CODE_LEN)
        .and_then(|len| u32::try_from(len).ok())
        .ok_or(FrameError::PayloadTooLarge {
            len: payload_len,
            max: MAX_PAYLOAD_LEN,
        })
}

/// Borrowed view of one complete frame found at the front of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Bytes the caller must remove from the front of the buffer.
    pub consumed: usize,
    /// Type code carried by the frame.
    pub type_code: u16,
    /// Payload bytes following the type code.
    pub payload: &'a [u8],
}

/// Outcome of a single decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// More bytes are needed before a frame can be produced.
    Incomplete,
    /// A complete frame sits at the front of the buffer.
    Frame(RawFrame<'a>),
}

/// Attempts to decode the frame at the front of `buffer`.
///
/// The buffer is never modified; callers remove [`RawFrame::consumed`] bytes
/// themselves and call again while frames keep coming.
///
/// # Errors
///
/// Returns [`FrameError::MalformedLength`] when the prefix declares fewer
/// bytes than the type code needs. The stream cannot be resynchronised after
/// that point.
pub fn try_decode(buffer: &[u8]) -> Result<Decoded<'_>, FrameError> {
    let Some(&[l0, l1, l2, l3, t0, t1]) = buffer.first_chunk::<HEADER_LEN>() else {
        return Ok(Decoded::Incomplete);
    };
    let length = u32::from_le_bytes([l0, l1, l2, l3]);
    let body_len = usize::try_from(length).unwrap_or(usize::MAX);
    if body_len < TYPE_CODE_LEN {
        return Err(FrameError::MalformedLength { length });
    }

    let Some(total) = LENGTH_PREFIX_LEN.checked_add(body_len) else {
        return Ok(Decoded::Incomplete);
    };
    let Some(frame) = buffer.get(..total) else {
        return Ok(Decoded::Incomplete);
    };

    Ok(Decoded::Frame(RawFrame {
        consumed: total,
        type_code: u16::from_le_bytes([t0, t1]),
        payload: frame.get(HEADER_LEN..).unwrap_or_default(),
    }))
}

/// Owned message frame: a type code and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    type_code: u16,
    payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame from a raw type code and payload.
    #[must_use]
    pub fn new(type_code: u16, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            type_code,
            payload: payload.into(),
        }
    }

    /// Builds a payload-less frame of a known type.
    #[must_use]
    pub fn empty(kind: MessageType) -> Self {
        Self::new(kind.code(), Vec::new())
    }

    /// Raw type code, including codes this build does not recognise.
    #[must_use]
    pub const fn type_code(&self) -> u16 {
        self.type_code
    }

    /// Known message type, if the code is recognised.
    #[must_use]
    pub const fn message_type(&self) -> Option<MessageType> {
        MessageType::from_code(self.type_code)
    }

    /// Payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the frame, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Encodes the frame for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLarge`] for oversized payloads.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        encode(self.type_code, &self.payload)
    }
}

impl From<RawFrame<'_>> for Frame {
    fn from(raw: RawFrame<'_>) -> Self {
        Self::new(raw.type_code, raw.payload)
    }
}
