//! Wire protocol shared by the glowpipe driver daemon and its clients.
//!
//! Every message travels as a self-delimiting frame:
//!
//! ```text
//! +----------------+----------------+------------------+
//! | length : u32   | type : u16     | payload : bytes  |
//! +----------------+----------------+------------------+
//! ```
//!
//! All integers are little-endian and `length` counts the type code plus the
//! payload, never the prefix itself. The [`frame`] module holds the pure codec,
//! [`FrameBuffer`] accumulates bytes read from a stream and hands back complete
//! frames, and [`payload`] interprets the bodies of the known message types.

pub mod buffer;
pub mod frame;
pub mod message;
pub mod payload;

pub use buffer::{BufferOverflow, DEFAULT_MAX_BUFFER_BYTES, FrameBuffer};
pub use frame::{
    Decoded, Frame, FrameError, HEADER_LEN, LENGTH_PREFIX_LEN, MAX_PAYLOAD_LEN, RawFrame,
    TYPE_CODE_LEN, encode, encode_into, try_decode,
};
pub use message::{Message, MessageType, UnknownMessageType};
pub use payload::{
    BRIGHTNESS_LEN, PayloadError, RGB_TRIPLE_LEN, Rgb, RgbParseError, StatusReport,
    decode_brightness, decode_colors, encode_brightness, encode_colors,
};
