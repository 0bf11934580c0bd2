//! Error types for the connection server.

use std::io;
use std::net::SocketAddr;

use nix::errno::Errno;
use thiserror::Error;

/// Errors surfaced while binding the listening endpoint.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty { host: String, port: u16 },
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("existing unix socket {path} is already in use")]
    UnixInUse { path: String },
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket { path: String },
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced by [`ConnectionServer`](super::ConnectionServer).
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` was called while a listener is already bound.
    #[error("server is already listening on {endpoint}")]
    AlreadyRunning { endpoint: String },
    /// An operation needed a bound listener but the server is stopped.
    #[error("server is not running")]
    NotRunning,
    /// The endpoint could not be bound.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: ListenerError,
    },
    /// `poll(2)` itself failed.
    #[error("reactor poll failed: {source}")]
    Poll {
        #[source]
        source: Errno,
    },
    /// The server thread panicked.
    #[error("server thread panicked")]
    ThreadPanic,
}
