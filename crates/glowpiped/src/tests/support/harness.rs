//! Drives a [`ConnectionServer`] turn by turn on the test thread.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use glowpipe_config::{DEFAULT_MAX_BUFFER_BYTES, SocketEndpoint};
use glowpipe_protocol::{FrameBuffer, Message};

use crate::server::{ConnectionServer, ServerError};

use super::Recorder;

const TURN: Duration = Duration::from_millis(20);
const DEADLINE: Duration = Duration::from_secs(2);
const CLIENT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// A server bound to a Unix socket in a temporary directory, plus clients.
pub(crate) struct DriverHarness {
    _dir: TempDir,
    endpoint: SocketEndpoint,
    pub(crate) recorder: Arc<Recorder>,
    pub(crate) server: ConnectionServer,
    clients: Vec<UnixStream>,
}

impl DriverHarness {
    /// Builds a stopped server with the given receive buffer cap.
    pub(crate) fn with_limit(max_buffer_bytes: usize) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("driver.sock");
        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
        let recorder = Arc::new(Recorder::default());
        let server = ConnectionServer::new(recorder.clone(), recorder.clone())
            .with_max_buffer_bytes(max_buffer_bytes);
        Self {
            _dir: dir,
            endpoint,
            recorder,
            server,
            clients: Vec::new(),
        }
    }

    pub(crate) fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_BUFFER_BYTES)
    }

    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    pub(crate) fn socket_path(&self) -> PathBuf {
        self.endpoint
            .unix_path()
            .expect("unix endpoint")
            .as_std_path()
            .to_path_buf()
    }

    pub(crate) fn start(&mut self) -> Result<(), ServerError> {
        let endpoint = self.endpoint.clone();
        self.server.start(&endpoint)
    }

    /// Connects a new client and waits until the server has registered it.
    pub(crate) fn connect(&mut self) -> usize {
        let before = self.server.client_count();
        let stream = UnixStream::connect(self.socket_path()).expect("connect client");
        stream
            .set_read_timeout(Some(CLIENT_READ_TIMEOUT))
            .expect("client read timeout");
        self.clients.push(stream);
        self.turn_until(|server| server.client_count() > before);
        self.clients.len() - 1
    }

    pub(crate) fn client_total(&self) -> usize {
        self.clients.len()
    }

    pub(crate) fn send(&mut self, client: usize, bytes: &[u8]) {
        self.clients
            .get_mut(client)
            .expect("known client")
            .write_all(bytes)
            .expect("client write");
    }

    pub(crate) fn send_message(&mut self, client: usize, message: &Message) {
        let bytes = message.encode().expect("encode message");
        self.send(client, &bytes);
    }

    /// Runs reactor turns until `done` holds.
    pub(crate) fn turn_until(&mut self, mut done: impl FnMut(&ConnectionServer) -> bool) {
        let deadline = Instant::now() + DEADLINE;
        while !done(&self.server) {
            assert!(Instant::now() < deadline, "server condition not reached");
            self.server.poll_once(TURN).expect("reactor turn");
        }
    }

    /// Runs reactor turns until `client` has received one complete reply.
    pub(crate) fn reply(&mut self, client: usize) -> Message {
        let mut buffer = FrameBuffer::new();
        let mut chunk = [0_u8; 512];
        let deadline = Instant::now() + DEADLINE;
        loop {
            if let Some(frame) = buffer.next_frame().expect("well formed reply") {
                return Message::from_frame(frame).expect("decodable reply");
            }
            assert!(Instant::now() < deadline, "no reply arrived");
            self.server.poll_once(TURN).expect("reactor turn");
            let stream = self.clients.get_mut(client).expect("known client");
            match stream.read(&mut chunk) {
                Ok(0) => panic!("server closed the connection"),
                Ok(read) => buffer.extend(&chunk[..read]).expect("within cap"),
                Err(error) if is_timeout(&error) => {}
                Err(error) => panic!("client read failed: {error}"),
            }
        }
    }

    /// Runs reactor turns until the server has closed `client`'s stream.
    pub(crate) fn wait_for_close(&mut self, client: usize) {
        let deadline = Instant::now() + DEADLINE;
        let mut chunk = [0_u8; 512];
        loop {
            assert!(Instant::now() < deadline, "connection was not closed");
            self.server.poll_once(TURN).expect("reactor turn");
            let stream = self.clients.get_mut(client).expect("known client");
            match stream.read(&mut chunk) {
                Ok(0) => return,
                Ok(_) => {}
                Err(error) if is_timeout(&error) => {}
                Err(error) if error.kind() == io::ErrorKind::ConnectionReset => return,
                Err(error) => panic!("client read failed: {error}"),
            }
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
