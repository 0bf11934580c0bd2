//! Error types for the client library and the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use glowpipe_config::EndpointNameError;
use glowpipe_protocol::{BufferOverflow, FrameError, MessageType, PayloadError};

/// Errors raised while talking to the driver.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP host name did not resolve.
    #[error("failed to resolve driver address {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The driver endpoint refused or timed out the connection.
    #[error("failed to connect to driver at {endpoint}: {source}")]
    Connect {
        /// Endpoint being connected to.
        endpoint: String,
        /// Socket failure.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are unavailable on this platform.
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    /// A message could not be encoded.
    #[error("failed to encode message: {source}")]
    Encode {
        /// Payload failure.
        #[source]
        source: PayloadError,
    },
    /// Writing to the driver failed.
    #[error("failed to send message to driver: {source}")]
    Send {
        /// Socket failure.
        #[source]
        source: io::Error,
    },
    /// Reading from the driver failed or timed out.
    #[error("failed to read reply from driver: {source}")]
    Receive {
        /// Socket failure.
        #[source]
        source: io::Error,
    },
    /// The driver closed the connection before a full reply arrived.
    #[error("driver closed the connection before replying")]
    Closed,
    /// The reply stream carried an impossible frame length.
    #[error("driver sent a malformed frame: {source}")]
    Malformed {
        /// Codec failure.
        #[source]
        source: FrameError,
    },
    /// The reply grew past the receive buffer cap.
    #[error("driver reply is too large: {source}")]
    Overflow {
        /// Buffer cap details.
        #[source]
        source: BufferOverflow,
    },
    /// The reply payload could not be interpreted.
    #[error("failed to decode driver reply: {source}")]
    Decode {
        /// Payload failure.
        #[source]
        source: PayloadError,
    },
    /// The driver answered with a different message type.
    #[error("unexpected reply type {type_code} from driver, expected {expected}")]
    UnexpectedReply {
        /// Type the request calls for.
        expected: MessageType,
        /// Type code actually received.
        type_code: u16,
    },
    /// Brightness outside `[0, 1]`.
    #[error("brightness {level} must be between 0 and 1")]
    BrightnessOutOfRange {
        /// Rejected level.
        level: f32,
    },
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve driver endpoint: {0}")]
    Endpoint(#[from] EndpointNameError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to render status report: {0}")]
    RenderStatus(PayloadError),
    #[error("failed to write command output: {0}")]
    Output(io::Error),
}
