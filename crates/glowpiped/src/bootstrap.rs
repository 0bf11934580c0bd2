//! Driver bootstrap: configuration, telemetry, endpoint and server start.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::info;

use glowpipe_config::{Config, EndpointNameError, SocketEndpoint, SocketPreparationError};

use crate::device::DeviceController;
use crate::observer::ClientObserver;
use crate::server::{ConnectionServer, ServerError, ServerHandle};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the driver configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads CLI flags, environment and configuration files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that always yields the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
    /// The endpoint name does not map to a usable socket path.
    #[error("failed to resolve driver endpoint: {source}")]
    Endpoint {
        #[source]
        source: EndpointNameError,
    },
    /// The socket directory could not be prepared.
    #[error("failed to prepare driver socket: {source}")]
    Socket {
        #[source]
        source: SocketPreparationError,
    },
    /// The server could not bind its endpoint.
    #[error("failed to start connection server: {source}")]
    Server {
        #[source]
        source: ServerError,
    },
}

/// Collaborators handed to the connection server.
#[derive(Clone)]
pub struct Services {
    /// Receives decoded lighting commands.
    pub device: Arc<dyn DeviceController>,
    /// Notified as clients come and go.
    pub observer: Arc<dyn ClientObserver>,
}

/// A running driver: resolved configuration plus the serving thread.
pub struct Daemon {
    config: Config,
    endpoint: SocketEndpoint,
    telemetry: TelemetryHandle,
    server: ServerHandle,
}

impl Daemon {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Endpoint the server is listening on.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Stops the server and waits for its thread to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`ServerError`] that ended the reactor, if any.
    pub fn shutdown(self) -> Result<(), ServerError> {
        self.server.shutdown();
        self.server.join()
    }
}

/// Loads configuration, installs telemetry and starts the server.
///
/// The server is bound before this returns, so bind failures are reported
/// here rather than from the serving thread.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    services: Services,
) -> Result<Daemon, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let endpoint = config
        .daemon_socket()
        .map_err(|source| BootstrapError::Endpoint { source })?;
    endpoint
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;

    let mut server = ConnectionServer::new(services.device, services.observer)
        .with_max_buffer_bytes(config.max_buffer_bytes());
    server
        .start(&endpoint)
        .map_err(|source| BootstrapError::Server { source })?;
    let server = server
        .spawn()
        .map_err(|source| BootstrapError::Server { source })?;

    info!(
        target: BOOTSTRAP_TARGET,
        endpoint = %endpoint,
        endpoint_name = config.endpoint_name(),
        log_filter = config.log_filter(),
        log_format = %config.log_format(),
        "driver bootstrap completed"
    );

    Ok(Daemon {
        config,
        endpoint,
        telemetry,
        server,
    })
}
