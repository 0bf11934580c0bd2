//! Socket transport helpers for the glowpipe client.
//!
//! The functions here establish connections to the driver endpoint and wrap
//! the resulting streams in a uniform [`Connection`] so the client logic can
//! remain transport agnostic.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use glowpipe_config::SocketEndpoint;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::errors::ClientError;

/// Default bound on connecting to, and hearing back from, the driver.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Opens a connection and applies `timeout` to subsequent reads.
pub(crate) fn connect(
    endpoint: &SocketEndpoint,
    timeout: Duration,
) -> Result<Connection, ClientError> {
    let connection = open(endpoint, timeout)?;
    connection
        .set_read_timeout(Some(timeout))
        .map_err(|source| ClientError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
    Ok(connection)
}

fn open(endpoint: &SocketEndpoint, timeout: Duration) -> Result<Connection, ClientError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let endpoint_display = endpoint.to_string();
            let address =
                resolve_tcp_address(host, *port).map_err(|source| ClientError::Resolve {
                    endpoint: endpoint_display.clone(),
                    source,
                })?;

            TcpStream::connect_timeout(&address, timeout)
                .map(Connection::Tcp)
                .map_err(|source| ClientError::Connect {
                    endpoint: endpoint_display,
                    source,
                })
        }
        #[cfg(unix)]
        SocketEndpoint::Unix { path } => {
            connect_unix(path.as_str(), timeout).map_err(|source| ClientError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })
        }
        #[cfg(not(unix))]
        SocketEndpoint::Unix { .. } => {
            Err(ClientError::UnsupportedUnixTransport(endpoint.to_string()))
        }
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    let stream: UnixStream = socket.into();
    Ok(Connection::Unix(stream))
}
