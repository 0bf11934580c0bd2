//! Single-threaded connection server.
//!
//! One control thread owns the listener and every connection. Each reactor
//! turn waits in `poll(2)` for readiness, accepts pending clients, reads and
//! dispatches complete frames, flushes queued replies and finally destroys
//! connections retired during the turn. Nothing here blocks except `poll`.

mod connection;
mod errors;
mod handle;
mod listener;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{debug, info, warn};

use glowpipe_config::{DEFAULT_MAX_BUFFER_BYTES, SocketEndpoint};
use glowpipe_protocol::Message;

use crate::device::DeviceController;
use crate::dispatch::{DispatchContext, dispatch};
use crate::observer::ClientObserver;

use self::connection::{Connection, QueueError, ReadOutcome};
use self::listener::SocketListener;

pub use self::connection::ClientId;
pub use self::errors::{ListenerError, ServerError};
pub use self::handle::ServerHandle;

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Poll timeout used by [`ConnectionServer::run_until`]; bounds how long a
/// shutdown request can go unnoticed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const HANG_UP: PollFlags = PollFlags::POLLHUP
    .union(PollFlags::POLLERR)
    .union(PollFlags::POLLNVAL);

/// Why a connection left the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    PeerClosed,
    HangUp,
    Overflow,
    Backlog,
    Malformed,
    Stopping,
}

impl CloseReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::HangUp => "hang_up",
            Self::Overflow => "buffer_overflow",
            Self::Backlog => "send_backlog",
            Self::Malformed => "malformed_frame",
            Self::Stopping => "server_stopping",
        }
    }
}

/// Accepts clients on one endpoint and serves the lighting protocol.
pub struct ConnectionServer {
    device: Arc<dyn DeviceController>,
    observer: Arc<dyn ClientObserver>,
    max_buffer_bytes: usize,
    listener: Option<SocketListener>,
    connections: BTreeMap<ClientId, Connection>,
    retired: Vec<Connection>,
    next_client: u64,
}

impl ConnectionServer {
    /// Builds a stopped server around its collaborators.
    pub fn new(device: Arc<dyn DeviceController>, observer: Arc<dyn ClientObserver>) -> Self {
        Self {
            device,
            observer,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            listener: None,
            connections: BTreeMap::new(),
            retired: Vec::new(),
            next_client: 0,
        }
    }

    /// Caps each connection's receive and send buffers at `limit` bytes.
    #[must_use]
    pub fn with_max_buffer_bytes(mut self, limit: usize) -> Self {
        self.max_buffer_bytes = limit;
        self
    }

    /// Binds the endpoint and starts accepting clients.
    ///
    /// A Unix socket left behind by a crashed instance is removed first; a
    /// socket with a live listener behind it is left alone and reported.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] when already listening and
    /// [`ServerError::Bind`] when the endpoint cannot be bound.
    pub fn start(&mut self, endpoint: &SocketEndpoint) -> Result<(), ServerError> {
        if let Some(listener) = &self.listener {
            return Err(ServerError::AlreadyRunning {
                endpoint: listener.endpoint().to_string(),
            });
        }
        let listener = SocketListener::bind(endpoint).map_err(|source| ServerError::Bind {
            endpoint: endpoint.to_string(),
            source,
        })?;
        info!(
            target: SERVER_TARGET,
            endpoint = %endpoint,
            max_buffer_bytes = self.max_buffer_bytes,
            "connection server started"
        );
        self.listener = Some(listener);
        Ok(())
    }

    /// Closes every connection and the listener, removing the socket file.
    ///
    /// Calling `stop` on a stopped server does nothing.
    pub fn stop(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let ids: Vec<ClientId> = self.connections.keys().copied().collect();
        for id in ids {
            self.disconnect(id, CloseReason::Stopping);
        }
        self.retired.clear();
        info!(
            target: SERVER_TARGET,
            endpoint = %listener.endpoint(),
            "connection server stopped"
        );
        drop(listener);
    }

    /// Whether a listener is currently bound.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// Number of live clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    /// Endpoint the server is listening on.
    #[must_use]
    pub fn endpoint(&self) -> Option<&SocketEndpoint> {
        self.listener.as_ref().map(SocketListener::endpoint)
    }

    /// Bound TCP address; useful when listening on port 0.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(SocketListener::local_addr)
    }

    /// Runs one reactor turn, waiting at most `timeout` for readiness.
    ///
    /// Returns the number of sources that were ready. An interrupted wait
    /// counts as a turn with nothing ready.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotRunning`] when stopped and
    /// [`ServerError::Poll`] when `poll(2)` fails outright.
    pub fn poll_once(&mut self, timeout: Duration) -> Result<usize, ServerError> {
        let (listener_ready, ready) = self.wait(timeout)?;
        if listener_ready {
            self.on_accept();
        }
        for &(id, events) in &ready {
            self.on_ready(id, events);
        }
        // Streams retired during this turn are destroyed only now.
        self.retired.clear();
        Ok(ready.len() + usize::from(listener_ready))
    }

    /// Runs reactor turns until `shutdown` is set, then stops the server.
    ///
    /// # Errors
    ///
    /// Propagates [`ServerError`] from [`ConnectionServer::poll_once`]; the
    /// server is stopped in either case.
    pub fn run_until(&mut self, shutdown: &AtomicBool) -> Result<(), ServerError> {
        let outcome = loop {
            if shutdown.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(error) = self.poll_once(DEFAULT_POLL_INTERVAL) {
                break Err(error);
            }
        };
        self.stop();
        outcome
    }

    /// Moves a started server onto its own control thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotRunning`] unless [`ConnectionServer::start`]
    /// succeeded first, so bind failures surface before the thread exists.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        if !self.is_running() {
            return Err(ServerError::NotRunning);
        }
        Ok(ServerHandle::spawn(self))
    }

    fn wait(&self, timeout: Duration) -> Result<(bool, Vec<(ClientId, PollFlags)>), ServerError> {
        let listener = self.listener.as_ref().ok_or(ServerError::NotRunning)?;
        let mut fds = Vec::with_capacity(self.connections.len() + 1);
        fds.push(PollFd::new(listener.as_fd(), PollFlags::POLLIN));
        for connection in self.connections.values() {
            fds.push(PollFd::new(connection.as_fd(), connection.interest()));
        }

        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok((false, Vec::new())),
            Err(source) => return Err(ServerError::Poll { source }),
        }

        let mut revents = fds.iter().map(|fd| fd.revents().unwrap_or(PollFlags::empty()));
        let listener_ready = revents
            .next()
            .is_some_and(|events| events.contains(PollFlags::POLLIN));
        let ready = self
            .connections
            .keys()
            .copied()
            .zip(revents)
            .filter(|(_, events)| !events.is_empty())
            .collect();
        Ok((listener_ready, ready))
    }

    /// Accepts every pending client.
    fn on_accept(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };
        loop {
            match listener.accept() {
                Ok(Some(stream)) => {
                    self.next_client += 1;
                    let id = ClientId::new(self.next_client);
                    self.connections
                        .insert(id, Connection::new(id, stream, self.max_buffer_bytes));
                    info!(
                        target: SERVER_TARGET,
                        client = %id,
                        clients = self.connections.len(),
                        "client accepted"
                    );
                    self.observer.client_connected(id);
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(
                        target: SERVER_TARGET,
                        error = %error,
                        "failed to accept client"
                    );
                    break;
                }
            }
        }
    }

    fn on_ready(&mut self, id: ClientId, events: PollFlags) {
        if events.intersects(PollFlags::POLLIN | HANG_UP) {
            self.on_readable(id);
        }
        if events.contains(PollFlags::POLLOUT) {
            self.on_writable(id);
        }
        if events.intersects(HANG_UP) && self.connections.contains_key(&id) {
            self.disconnect(id, CloseReason::HangUp);
        }
    }

    /// Reads and dispatches everything the client has sent so far.
    fn on_readable(&mut self, id: ClientId) {
        let connected_clients = self.connections.len();
        let Some(connection) = self.connections.get_mut(&id) else {
            return;
        };
        let context = DispatchContext {
            client: id,
            device: self.device.as_ref(),
            connected_clients,
        };
        let outcome = connection.read_frames(|connection, frame| {
            if let Some(reply) = dispatch(&context, &frame) {
                queue_reply(connection, &reply);
            }
        });
        flush(connection);

        match outcome {
            ReadOutcome::Drained => {}
            ReadOutcome::Failed(error) => {
                warn!(
                    target: SERVER_TARGET,
                    client = %id,
                    error = %error,
                    "read failed"
                );
            }
            ReadOutcome::Closed => self.disconnect(id, CloseReason::PeerClosed),
            ReadOutcome::Overflow(overflow) => {
                warn!(
                    target: SERVER_TARGET,
                    client = %id,
                    error = %overflow,
                    "receive buffer cap exceeded; closing connection"
                );
                self.disconnect(id, CloseReason::Overflow);
            }
            ReadOutcome::Backlogged(overflow) => {
                warn!(
                    target: SERVER_TARGET,
                    client = %id,
                    error = %overflow,
                    "client is not reading replies; closing connection"
                );
                self.disconnect(id, CloseReason::Backlog);
            }
            ReadOutcome::Malformed(error) => {
                warn!(
                    target: SERVER_TARGET,
                    client = %id,
                    error = %error,
                    "malformed frame; closing connection"
                );
                self.disconnect(id, CloseReason::Malformed);
            }
        }
    }

    fn on_writable(&mut self, id: ClientId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            flush(connection);
        }
    }

    /// Removes a client from the live set and retires its stream.
    fn disconnect(&mut self, id: ClientId, reason: CloseReason) {
        let Some(connection) = self.connections.remove(&id) else {
            return;
        };
        if let Err(error) = connection.close() {
            debug!(
                target: SERVER_TARGET,
                client = %id,
                error = %error,
                "shutdown failed; peer already gone"
            );
        }
        info!(
            target: SERVER_TARGET,
            client = %id,
            reason = reason.as_str(),
            unread_bytes = connection.buffered_input(),
            unsent_bytes = connection.pending_output(),
            clients = self.connections.len(),
            "client disconnected"
        );
        self.retired.push(connection);
        self.observer.client_disconnected(id);
    }
}

impl Drop for ConnectionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn queue_reply(connection: &mut Connection, reply: &Message) {
    let frame = match reply.to_frame() {
        Ok(frame) => frame,
        Err(error) => {
            warn!(
                target: SERVER_TARGET,
                client = %connection.id(),
                message_type = reply.type_code(),
                error = %error,
                "failed to encode reply"
            );
            return;
        }
    };
    match connection.queue(&frame) {
        // A backlog surfaces as `ReadOutcome::Backlogged`.
        Ok(()) | Err(QueueError::Backlog(_)) => {}
        Err(QueueError::Encode(error)) => {
            warn!(
                target: SERVER_TARGET,
                client = %connection.id(),
                message_type = reply.type_code(),
                error = %error,
                "failed to encode reply"
            );
        }
        Err(QueueError::Write(error)) => {
            debug!(
                target: SERVER_TARGET,
                client = %connection.id(),
                error = %error,
                "write failed; waiting for hang-up"
            );
        }
    }
}

fn flush(connection: &mut Connection) {
    if let Err(error) = connection.flush() {
        debug!(
            target: SERVER_TARGET,
            client = %connection.id(),
            error = %error,
            "write failed; waiting for hang-up"
        );
    }
}
