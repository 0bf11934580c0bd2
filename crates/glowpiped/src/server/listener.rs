//! Listening socket for the driver endpoint.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use tracing::{info, warn};

use glowpipe_config::SocketEndpoint;

use super::{ListenerError, SERVER_TARGET};

/// Non-blocking listener bound to a [`SocketEndpoint`].
///
/// Dropping the listener removes its Unix socket file.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds the endpoint, clearing a stale Unix socket first.
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = match endpoint {
            SocketEndpoint::Tcp { host, port } => ListenerKind::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => ListenerKind::Unix(bind_unix(path.as_std_path())?),
        };
        let bound = Self {
            endpoint: endpoint.clone(),
            listener,
        };
        let nonblocking = match &bound.listener {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        };
        nonblocking.map_err(|source| ListenerError::NonBlocking { source })?;
        info!(
            target: SERVER_TARGET,
            endpoint = %bound.endpoint,
            "socket listener bound"
        );
        Ok(bound)
    }

    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            ListenerKind::Unix(_) => None,
        }
    }

    /// Accepts one pending connection, or `None` when the backlog is empty.
    ///
    /// Accepted streams are switched to non-blocking mode.
    pub(crate) fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match &self.listener {
            ListenerKind::Tcp(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Tcp(stream)),
            ListenerKind::Unix(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Unix(stream)),
        };
        let stream = match accepted {
            Ok(stream) => stream,
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error),
        };
        if let ConnectionStream::Tcp(tcp) = &stream {
            tcp.set_nodelay(true)?;
        }
        stream.set_nonblocking(true)?;
        Ok(Some(stream))
    }
}

impl AsFd for SocketListener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.as_fd(),
            ListenerKind::Unix(listener) => listener.as_fd(),
        }
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let SocketEndpoint::Unix { path } = &self.endpoint else {
            return;
        };
        if let Err(error) = fs::remove_file(path.as_std_path())
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: SERVER_TARGET,
                error = %error,
                path = %path,
                "failed to remove unix socket file"
            );
        }
    }
}

/// Accepted client stream.
#[derive(Debug)]
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl ConnectionStream {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_nonblocking(nonblocking),
            Self::Unix(stream) => stream.set_nonblocking(nonblocking),
        }
    }

    pub(crate) fn shutdown(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            Self::Unix(stream) => stream.flush(),
        }
    }
}

impl AsFd for ConnectionStream {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Tcp(stream) => stream.as_fd(),
            Self::Unix(stream) => stream.as_fd(),
        }
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

/// Binds a Unix listener, first removing a socket file nobody answers on.
fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    let display = || path.display().to_string();
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if !metadata.file_type().is_socket() {
                return Err(ListenerError::UnixNotSocket { path: display() });
            }
            remove_if_stale(path)?;
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ListenerError::UnixMetadata {
                path: display(),
                source,
            });
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: display(),
        source,
    })
}

fn remove_if_stale(path: &Path) -> Result<(), ListenerError> {
    match UnixStream::connect(path) {
        Ok(_live) => Err(ListenerError::UnixInUse {
            path: path.display().to_string(),
        }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            warn!(
                target: SERVER_TARGET,
                path = %path.display(),
                "removing stale unix socket"
            );
            fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                path: path.display().to_string(),
                source,
            })
        }
        Err(source) => Err(ListenerError::UnixConnect {
            path: path.display().to_string(),
            source,
        }),
    }
}
