//! Fake driver that serves one client over a private Unix socket.
//!
//! Frames are decoded with the real codec and recorded so tests can assert on
//! exactly what the client sent.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use glowpipe_config::SocketEndpoint;
use glowpipe_protocol::{Frame, FrameBuffer, Message, MessageType, StatusReport};

const ACCEPT_TIMEOUT: Duration = Duration::from_secs(5);

/// How the fake driver answers each frame.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Answers pings and status requests like the real driver.
    Faithful { connected_clients: usize },
    /// Writes these bytes in answer to every frame.
    Raw(Vec<u8>),
    /// Closes the connection on the first frame.
    HangUp,
}

impl Reply {
    fn respond(&self, frame: &Frame) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Faithful { connected_clients } => {
                let message = match frame.message_type() {
                    Some(MessageType::Ping) => Message::Pong,
                    Some(MessageType::GetStatus) => {
                        Message::StatusResponse(StatusReport::ok(*connected_clients))
                    }
                    _ => return Ok(None),
                };
                Ok(Some(message.encode().context("encode reply")?))
            }
            Self::Raw(bytes) => Ok(Some(bytes.clone())),
            Self::HangUp => Ok(None),
        }
    }
}

pub(crate) struct FakeDriver {
    _dir: TempDir,
    endpoint: SocketEndpoint,
    frames: Arc<Mutex<Vec<Frame>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDriver {
    pub(crate) fn spawn(reply: Reply) -> Result<Self> {
        let dir = TempDir::new().context("create socket directory")?;
        let path = dir.path().join("driver.sock");
        let listener = UnixListener::bind(&path).context("bind fake driver")?;
        listener
            .set_nonblocking(true)
            .context("fake driver nonblocking")?;
        let endpoint =
            SocketEndpoint::unix(path.to_str().context("socket path is not UTF-8")?);

        let frames = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&frames);
        let handle = thread::spawn(move || {
            let stream = accept(&listener)?;
            serve(stream, &reply, &recorded)
        });

        Ok(Self {
            _dir: dir,
            endpoint,
            frames,
            handle: Some(handle),
        })
    }

    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Waits for the client to hang up and returns the frames it sent.
    pub(crate) fn take_frames(&mut self) -> Result<Vec<Frame>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake driver thread panicked"))??;
        }
        let frames = self
            .frames
            .lock()
            .map_err(|error| anyhow!("lock frames: {error}"))?;
        Ok(frames.clone())
    }
}

fn accept(listener: &UnixListener) -> Result<UnixStream> {
    let deadline = Instant::now() + ACCEPT_TIMEOUT;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).context("blocking stream")?;
                return Ok(stream);
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(anyhow!("no client connected to the fake driver"));
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => return Err(error).context("accept client"),
        }
    }
}

fn serve(mut stream: UnixStream, reply: &Reply, frames: &Mutex<Vec<Frame>>) -> Result<()> {
    let mut buffer = FrameBuffer::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = stream.read(&mut chunk).context("read from client")?;
        if read == 0 {
            return Ok(());
        }
        buffer
            .extend(chunk.get(..read).unwrap_or_default())
            .context("client overflowed the fake driver")?;
        while let Some(frame) = buffer.next_frame().context("client sent a malformed frame")? {
            let response = reply.respond(&frame)?;
            frames
                .lock()
                .map_err(|error| anyhow!("lock frames: {error}"))?
                .push(frame);
            if matches!(reply, Reply::HangUp) {
                return Ok(());
            }
            if let Some(bytes) = response {
                stream.write_all(&bytes).context("write reply")?;
            }
        }
    }
}
