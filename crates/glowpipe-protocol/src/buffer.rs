//! Receive buffer that reassembles frames from arbitrary stream reads.
//!
//! Bytes are appended in arrival order and complete frames are removed from
//! the front one at a time. A partial trailing frame stays buffered until the
//! rest of it arrives. The buffer is capped so a peer that never completes a
//! frame cannot grow it without bound. The cap applies to unconsumed bytes
//! only; readers size each read with [`FrameBuffer::remaining_capacity`] and
//! drain frames before reading again.

use bytes::BytesMut;
use thiserror::Error;

use crate::frame::{Decoded, Frame, FrameError, HEADER_LEN, try_decode};

/// Default receive buffer cap: 4 MiB.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Raised when appending would push the buffer past its cap.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("buffer would grow to {attempted} bytes, above the {limit} byte cap")]
pub struct BufferOverflow {
    /// Size the buffer would have reached.
    pub attempted: usize,
    /// Configured cap.
    pub limit: usize,
}

/// FIFO byte buffer that yields complete frames.
///
/// Consumed frames are split off the front without moving the bytes behind
/// them.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    bytes: BytesMut,
    limit: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Empty buffer with the default cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_BUFFER_BYTES)
    }

    /// Empty buffer holding at most `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: BytesMut::new(),
            limit,
        }
    }

    /// Appends freshly read bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BufferOverflow`] and leaves the buffer unchanged when the
    /// append would exceed the cap.
    pub fn extend(&mut self, chunk: &[u8]) -> Result<(), BufferOverflow> {
        let attempted = self.bytes.len().saturating_add(chunk.len());
        if attempted > self.limit {
            return Err(BufferOverflow {
                attempted,
                limit: self.limit,
            });
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    /// Removes and returns the frame at the front of the buffer.
    ///
    /// Returns `Ok(None)` while the front frame is still incomplete; nothing
    /// is consumed in that case.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MalformedLength`] when the front of the buffer
    /// cannot be a frame. The buffer is left untouched.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let (consumed, type_code) = match try_decode(&self.bytes)? {
            Decoded::Incomplete => return Ok(None),
            Decoded::Frame(raw) => (raw.consumed, raw.type_code),
        };
        let framed = self.bytes.split_to(consumed);
        let payload = framed.get(HEADER_LEN..).unwrap_or_default();
        Ok(Some(Frame::new(type_code, payload)))
    }

    /// Drains every complete frame currently buffered.
    ///
    /// # Errors
    ///
    /// Stops at the first malformed frame; frames before it are discarded
    /// along with the error, so callers that need them should loop over
    /// [`FrameBuffer::next_frame`] instead.
    pub fn drain_frames(&mut self) -> Result<Vec<Frame>, FrameError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes that can still be appended without hitting the cap.
    ///
    /// Zero while frames are still buffered means the front frame alone
    /// fills the cap and can never complete.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.limit.saturating_sub(self.bytes.len())
    }

    /// Configured cap.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Buffered bytes, oldest first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode;
    use rstest::{fixture, rstest};

    #[fixture]
    fn buffer() -> FrameBuffer {
        FrameBuffer::new()
    }

    #[rstest]
    fn every_split_point_yields_one_frame(mut buffer: FrameBuffer) {
        let bytes = encode(10, &[1, 2, 3, 4, 5, 6, 7, 8, 9]).expect("encode");
        for split in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(split);
            buffer.extend(head).expect("within cap");
            if split < bytes.len() {
                assert_eq!(buffer.next_frame(), Ok(None), "split at {split}");
            }
            buffer.extend(tail).expect("within cap");
            let frame = buffer
                .next_frame()
                .expect("well formed")
                .expect("complete after both halves");
            assert_eq!(frame.type_code(), 10);
            assert_eq!(frame.payload(), [1, 2, 3, 4, 5, 6, 7, 8, 9]);
            assert!(buffer.is_empty());
        }
    }

    #[rstest]
    fn byte_at_a_time_reassembles(mut buffer: FrameBuffer) {
        let bytes = encode(21, b"{}").expect("encode");
        let (last, head) = bytes.split_last().expect("non-empty");
        for byte in head {
            buffer.extend(&[*byte]).expect("within cap");
            assert_eq!(buffer.next_frame(), Ok(None));
        }
        buffer.extend(&[*last]).expect("within cap");
        let frame = buffer.next_frame().expect("decode").expect("complete");
        assert_eq!(frame.payload(), b"{}");
    }

    #[rstest]
    fn coalesced_frames_drain_in_order(mut buffer: FrameBuffer) {
        let mut bytes = encode(1, &[]).expect("encode");
        bytes.extend(encode(11, &0.5_f32.to_le_bytes()).expect("encode"));
        buffer.extend(&bytes).expect("within cap");

        let frames = buffer.drain_frames().expect("decode");
        let codes: Vec<u16> = frames.iter().map(Frame::type_code).collect();
        assert_eq!(codes, [1, 11]);
        assert!(buffer.is_empty());
    }

    #[rstest]
    fn partial_frame_is_retained(mut buffer: FrameBuffer) {
        let bytes = encode(10, &[9; 12]).expect("encode");
        let partial = bytes.get(..bytes.len() - 1).expect("slice");
        buffer.extend(partial).expect("within cap");

        assert_eq!(buffer.drain_frames(), Ok(Vec::new()));
        assert_eq!(buffer.as_bytes(), partial);
    }

    #[test]
    fn overflow_leaves_buffer_untouched() {
        let mut buffer = FrameBuffer::with_limit(8);
        buffer.extend(&[0; 6]).expect("within cap");
        let error = buffer.extend(&[0; 3]).expect_err("over cap");
        assert_eq!(
            error,
            BufferOverflow {
                attempted: 9,
                limit: 8
            }
        );
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn draining_frees_room_under_the_cap() {
        let ping = encode(1, &[]).expect("encode");
        let mut buffer = FrameBuffer::with_limit(ping.len());
        for _ in 0..3 {
            assert_eq!(buffer.remaining_capacity(), ping.len());
            buffer.extend(&ping).expect("one frame fits");
            assert_eq!(buffer.remaining_capacity(), 0);
            let frame = buffer.next_frame().expect("decode").expect("complete");
            assert_eq!(frame.type_code(), 1);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn many_coalesced_frames_drain_from_the_front() {
        let mut bytes = Vec::new();
        for index in 0..10_000_u16 {
            bytes.extend(encode(index, &[]).expect("encode"));
        }
        let mut buffer = FrameBuffer::new();
        buffer.extend(&bytes).expect("within cap");

        let codes: Vec<u16> = buffer
            .drain_frames()
            .expect("decode")
            .iter()
            .map(Frame::type_code)
            .collect();
        assert_eq!(codes, (0..10_000).collect::<Vec<u16>>());
        assert_eq!(buffer.remaining_capacity(), DEFAULT_MAX_BUFFER_BYTES);
    }

    #[rstest]
    fn malformed_prefix_is_reported_without_consuming(mut buffer: FrameBuffer) {
        buffer.extend(&[1, 0, 0, 0, 1, 0]).expect("within cap");
        assert_eq!(
            buffer.next_frame(),
            Err(FrameError::MalformedLength { length: 1 })
        );
        assert_eq!(buffer.len(), 6);
    }
}
