//! Shared configuration for the glowpipe driver and its client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! (`--config-path` or `GLOWPIPE_CONFIG_PATH`), then `GLOWPIPE_*` environment
//! variables, then command-line flags. Both binaries load the same [`Config`]
//! so they always agree on where the driver listens.

mod defaults;
mod logging;
mod socket;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ENDPOINT_NAME, DEFAULT_LOG_FILTER, DEFAULT_MAX_BUFFER_BYTES, DEFAULT_TCP_PORT,
    default_endpoint_name, default_log_filter, default_log_format, default_socket_endpoint,
    endpoint_for_name,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{EndpointNameError, SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "GLOWPIPE")]
pub struct Config {
    /// Endpoint name mapped onto a per-user socket path.
    #[ortho_config(default = defaults::default_endpoint_name())]
    endpoint_name: String,
    /// Explicit socket address; takes precedence over `endpoint_name`.
    daemon_socket: Option<SocketEndpoint>,
    /// `tracing` filter directive for the binaries.
    #[ortho_config(default = defaults::default_log_filter_string())]
    log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = defaults::default_log_format())]
    log_format: LogFormat,
    /// Per-connection cap, in bytes, on unframed input and on unsent output.
    #[ortho_config(default = defaults::DEFAULT_MAX_BUFFER_BYTES)]
    max_buffer_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_name: default_endpoint_name(),
            daemon_socket: None,
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

impl Config {
    /// Configuration listening on an explicit socket, otherwise defaulted.
    #[must_use]
    pub fn with_socket(daemon_socket: SocketEndpoint) -> Self {
        Self {
            daemon_socket: Some(daemon_socket),
            ..Self::default()
        }
    }

    /// Socket the driver binds and clients connect to.
    ///
    /// An explicit `daemon_socket` wins; otherwise the endpoint name is mapped
    /// to the platform default location.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointNameError`] when no socket is set and the name cannot
    /// be used as a file stem.
    pub fn daemon_socket(&self) -> Result<SocketEndpoint, EndpointNameError> {
        match &self.daemon_socket {
            Some(endpoint) => Ok(endpoint.clone()),
            None => SocketEndpoint::named(&self.endpoint_name),
        }
    }

    /// Configured endpoint name.
    #[must_use]
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    /// Filter directive handed to `tracing-subscriber`.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Structured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Cap applied to each connection's receive and send buffers.
    #[must_use]
    pub const fn max_buffer_bytes(&self) -> usize {
        self.max_buffer_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves_the_named_endpoint() {
        let config = Config::default();
        assert_eq!(config.endpoint_name(), DEFAULT_ENDPOINT_NAME);
        assert_eq!(
            config.daemon_socket(),
            Ok(endpoint_for_name(DEFAULT_ENDPOINT_NAME))
        );
    }

    #[test]
    fn explicit_socket_overrides_the_name() {
        let endpoint = SocketEndpoint::tcp("127.0.0.1", 9100);
        let config = Config::with_socket(endpoint.clone());
        assert_eq!(config.daemon_socket(), Ok(endpoint));
    }

    #[test]
    fn unusable_name_is_reported() {
        let config = Config {
            endpoint_name: "../driver".to_owned(),
            ..Config::default()
        };
        assert!(config.daemon_socket().is_err());
    }
}
