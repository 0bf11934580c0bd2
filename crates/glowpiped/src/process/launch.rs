//! Runs the driver from bootstrap to shutdown.

use std::sync::Arc;

use tracing::{error, info};

use crate::bootstrap::{ConfigLoader, Services, SystemConfigLoader, bootstrap_with};
use crate::device::LoggingDeviceController;
use crate::observer::StructuredClientObserver;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the driver with the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    let services = Services {
        device: Arc::new(LoggingDeviceController::new()),
        observer: Arc::new(StructuredClientObserver::new()),
    };
    run_daemon_with(&SystemConfigLoader, services, &SystemShutdownSignal)
}

/// Runs the driver with injected collaborators.
///
/// Blocks until `shutdown` fires, then stops the server and waits for its
/// thread so the endpoint is released before returning.
pub fn run_daemon_with(
    loader: &dyn ConfigLoader,
    services: Services,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, services).inspect_err(|failure| {
        error!(
            target: PROCESS_TARGET,
            error = %failure,
            "driver bootstrap failed"
        );
    })?;
    info!(
        target: PROCESS_TARGET,
        endpoint = %daemon.endpoint(),
        "driver running"
    );

    let waited = shutdown.wait();
    let stopped = daemon.shutdown();
    waited?;
    stopped?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
