//! Handle to a server running on its own control thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::error;

use super::{ConnectionServer, SERVER_TARGET, ServerError};

/// Owns the control thread of a spawned [`ConnectionServer`].
///
/// Dropping the handle requests shutdown without waiting for it.
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    pub(super) fn spawn(mut server: ConnectionServer) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            let outcome = server.run_until(&flag);
            if let Err(failure) = &outcome {
                error!(
                    target: SERVER_TARGET,
                    error = %failure,
                    "connection server stopped on error"
                );
            }
            outcome
        });
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Asks the server to stop after its current turn.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether the control thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(thread::JoinHandle::is_finished)
    }

    /// Waits for the control thread; the server is stopped when this returns.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the reactor, or
    /// [`ServerError::ThreadPanic`] if the thread panicked.
    pub fn join(mut self) -> Result<(), ServerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ServerError::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
