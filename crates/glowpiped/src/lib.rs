//! Lighting driver daemon.
//!
//! The driver listens on a local endpoint configured through
//! [`glowpipe_config`] and serves the length-prefixed protocol defined in
//! [`glowpipe_protocol`]. Clients push LED colours and brightness levels,
//! which are handed to a [`DeviceController`], and can ask for a short status
//! report.
//!
//! A [`ConnectionServer`] owns the listener and every connection on a single
//! control thread; readiness comes from `poll(2)` and no socket operation ever
//! blocks. [`run_daemon`] wires the server to configuration, telemetry and
//! signal handling for the `glowpiped` binary.

mod bootstrap;
mod device;
mod dispatch;
mod observer;
mod process;
mod server;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, Services, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use device::{DeviceController, LoggingDeviceController};
pub use observer::{ClientObserver, StructuredClientObserver};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon, run_daemon_with,
};
pub use server::{
    ClientId, ConnectionServer, DEFAULT_POLL_INTERVAL, ListenerError, ServerError, ServerHandle,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
