//! Per-client state owned by the server.

use std::fmt;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};

use nix::poll::PollFlags;

use glowpipe_protocol::{BufferOverflow, Frame, FrameBuffer, FrameError, HEADER_LEN, encode_into};

use super::listener::ConnectionStream;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Opaque identifier assigned to each accepted connection.
///
/// Identifiers are never reused within one server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u64);

impl ClientId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric value of the identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "client-{}", self.0)
    }
}

/// Why a read pass stopped.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// The socket has no more bytes for now.
    Drained,
    /// The peer closed its end.
    Closed,
    /// The receive buffer cap was hit.
    Overflow(BufferOverflow),
    /// Replies piled up past the send cap because the peer stopped reading.
    Backlogged(BufferOverflow),
    /// The stream carried a frame that cannot be parsed.
    Malformed(FrameError),
    /// The transport reported an error; the connection stays registered.
    Failed(io::Error),
}

/// Failure to queue a reply.
#[derive(Debug)]
pub(crate) enum QueueError {
    Encode(FrameError),
    Write(io::Error),
    Backlog(BufferOverflow),
}

/// One accepted client: its stream plus inbound and outbound buffers.
///
/// Both buffers share one cap.
#[derive(Debug)]
pub(crate) struct Connection {
    id: ClientId,
    stream: ConnectionStream,
    inbound: FrameBuffer,
    outbound: Vec<u8>,
    max_buffer_bytes: usize,
    backlog: Option<BufferOverflow>,
}

impl Connection {
    pub(crate) fn new(id: ClientId, stream: ConnectionStream, max_buffer_bytes: usize) -> Self {
        Self {
            id,
            stream,
            inbound: FrameBuffer::with_limit(max_buffer_bytes),
            outbound: Vec::new(),
            max_buffer_bytes,
            backlog: None,
        }
    }

    pub(crate) const fn id(&self) -> ClientId {
        self.id
    }

    /// Events the reactor should wait for on this connection.
    pub(crate) fn interest(&self) -> PollFlags {
        if self.outbound.is_empty() {
            PollFlags::POLLIN
        } else {
            PollFlags::POLLIN | PollFlags::POLLOUT
        }
    }

    /// Reads every available byte, handing each complete frame to `on_frame`
    /// as soon as the chunk that completed it has been buffered.
    ///
    /// Each read is sized to the room left under the cap, so only a partial
    /// frame that fills the whole buffer counts as an overflow.
    pub(crate) fn read_frames<F>(&mut self, mut on_frame: F) -> ReadOutcome
    where
        F: FnMut(&mut Self, Frame),
    {
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        loop {
            let room = self.inbound.remaining_capacity().min(READ_CHUNK_BYTES);
            if room == 0 {
                return ReadOutcome::Overflow(BufferOverflow {
                    attempted: self.inbound.len().saturating_add(1),
                    limit: self.inbound.limit(),
                });
            }
            let window = chunk.get_mut(..room).unwrap_or_default();
            let read = match self.stream.read(window) {
                Ok(0) => return ReadOutcome::Closed,
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    return ReadOutcome::Drained;
                }
                Err(error) => return ReadOutcome::Failed(error),
            };
            let fresh = chunk.get(..read).unwrap_or_default();
            if let Err(overflow) = self.inbound.extend(fresh) {
                return ReadOutcome::Overflow(overflow);
            }
            loop {
                match self.inbound.next_frame() {
                    Ok(Some(frame)) => on_frame(self, frame),
                    Ok(None) => break,
                    Err(error) => return ReadOutcome::Malformed(error),
                }
                if let Some(overflow) = self.backlog {
                    return ReadOutcome::Backlogged(overflow);
                }
            }
        }
    }

    /// Queues an encoded frame for delivery.
    ///
    /// When the frame would push unsent output past the cap, queued bytes are
    /// flushed first; if the peer still has not drained enough the frame is
    /// dropped and the connection is marked backlogged.
    pub(crate) fn queue(&mut self, frame: &Frame) -> Result<(), QueueError> {
        let frame_len = HEADER_LEN.saturating_add(frame.payload().len());
        if self.outbound.len().saturating_add(frame_len) > self.max_buffer_bytes {
            self.flush().map_err(QueueError::Write)?;
            let attempted = self.outbound.len().saturating_add(frame_len);
            if attempted > self.max_buffer_bytes {
                let overflow = BufferOverflow {
                    attempted,
                    limit: self.max_buffer_bytes,
                };
                self.backlog = Some(overflow);
                return Err(QueueError::Backlog(overflow));
            }
        }
        encode_into(&mut self.outbound, frame.type_code(), frame.payload())
            .map_err(QueueError::Encode)
    }

    /// Writes as much queued output as the socket accepts without blocking.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(written) => {
                    self.outbound.drain(..written);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Bytes still waiting to be written.
    pub(crate) fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Bytes received but not yet framed.
    pub(crate) fn buffered_input(&self) -> usize {
        self.inbound.len()
    }

    /// Shuts the transport down in both directions.
    pub(crate) fn close(&self) -> io::Result<()> {
        self.stream.shutdown()
    }
}

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}
