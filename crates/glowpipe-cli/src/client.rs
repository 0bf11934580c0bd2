//! Blocking client for the driver's framed protocol.
//!
//! A [`DriverClient`] owns one connection to the driver. Requests that expect
//! an answer (`ping`, `status`) block until the reply frame is complete or the
//! read timeout elapses; lighting commands are fire-and-forget because the
//! driver never acknowledges them.

use std::io::{Read, Write};
use std::time::Duration;

use glowpipe_config::SocketEndpoint;
use glowpipe_protocol::{BufferOverflow, FrameBuffer, Message, MessageType, Rgb, StatusReport};

use crate::errors::ClientError;
use crate::transport::{CONNECTION_TIMEOUT, Connection, connect};

const READ_CHUNK: usize = 4096;

/// Connection to a running driver.
pub struct DriverClient {
    connection: Connection,
    inbound: FrameBuffer,
}

impl DriverClient {
    /// Connects using [`CONNECTION_TIMEOUT`] for both connect and reads.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::Connect`] when the
    /// endpoint cannot be reached.
    pub fn connect(endpoint: &SocketEndpoint) -> Result<Self, ClientError> {
        Self::connect_with_timeout(endpoint, CONNECTION_TIMEOUT)
    }

    /// Connects with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::Connect`] when the
    /// endpoint cannot be reached.
    pub fn connect_with_timeout(
        endpoint: &SocketEndpoint,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            connection: connect(endpoint, timeout)?,
            inbound: FrameBuffer::new(),
        })
    }

    /// Writes one framed message.
    ///
    /// # Errors
    ///
    /// Fails when the message cannot be encoded or the write fails.
    pub fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        let bytes = message
            .encode()
            .map_err(|source| ClientError::Encode { source })?;
        self.connection
            .write_all(&bytes)
            .and_then(|()| self.connection.flush())
            .map_err(|source| ClientError::Send { source })
    }

    /// Blocks until the next complete message arrives.
    ///
    /// Bytes past the returned frame stay buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] on end of stream, and the matching
    /// variant for read, framing or payload failures.
    pub fn receive(&mut self) -> Result<Message, ClientError> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            let next = self
                .inbound
                .next_frame()
                .map_err(|source| ClientError::Malformed { source })?;
            if let Some(frame) = next {
                return Message::from_frame(frame).map_err(|source| ClientError::Decode { source });
            }

            let room = self.inbound.remaining_capacity().min(READ_CHUNK);
            if room == 0 {
                return Err(ClientError::Overflow {
                    source: BufferOverflow {
                        attempted: self.inbound.len().saturating_add(1),
                        limit: self.inbound.limit(),
                    },
                });
            }
            let read = self
                .connection
                .read(chunk.get_mut(..room).unwrap_or_default())
                .map_err(|source| ClientError::Receive { source })?;
            if read == 0 {
                return Err(ClientError::Closed);
            }
            self.inbound
                .extend(chunk.get(..read).unwrap_or_default())
                .map_err(|source| ClientError::Overflow { source })?;
        }
    }

    /// Sends a ping and waits for the pong.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnexpectedReply`] when anything but a pong comes
    /// back.
    pub fn ping(&mut self) -> Result<(), ClientError> {
        self.send(&Message::Ping)?;
        match self.receive()? {
            Message::Pong => Ok(()),
            other => Err(unexpected(MessageType::Pong, &other)),
        }
    }

    /// Requests the driver status report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnexpectedReply`] when the reply is not a status
    /// response.
    pub fn status(&mut self) -> Result<StatusReport, ClientError> {
        self.send(&Message::GetStatus)?;
        match self.receive()? {
            Message::StatusResponse(report) => Ok(report),
            other => Err(unexpected(MessageType::StatusResponse, &other)),
        }
    }

    /// Sends a frame of colours. The driver does not reply.
    ///
    /// # Errors
    ///
    /// Fails when the write fails.
    pub fn set_led_colors(&mut self, colors: &[Rgb]) -> Result<(), ClientError> {
        self.send(&Message::SetLedColors(colors.to_vec()))
    }

    /// Sends a brightness level in `[0, 1]`. The driver does not reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BrightnessOutOfRange`] without touching the
    /// connection when `level` is outside `[0, 1]` or not a number.
    pub fn set_brightness(&mut self, level: f32) -> Result<(), ClientError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(ClientError::BrightnessOutOfRange { level });
        }
        self.send(&Message::SetBrightness(level))
    }
}

fn unexpected(expected: MessageType, reply: &Message) -> ClientError {
    ClientError::UnexpectedReply {
        expected,
        type_code: reply.type_code(),
    }
}
