//! Errors surfaced while launching or supervising the driver process.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::server::ServerError;

use super::shutdown::ShutdownError;

/// Errors that end the driver process with a failure status.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the driver failed.
    #[error("driver bootstrap failed: {source}")]
    Bootstrap {
        #[source]
        source: BootstrapError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        #[source]
        source: ShutdownError,
    },
    /// The server stopped on an error rather than on request.
    #[error("connection server failed: {source}")]
    Server {
        #[source]
        source: ServerError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<ServerError> for LaunchError {
    fn from(source: ServerError) -> Self {
        Self::Server { source }
    }
}
