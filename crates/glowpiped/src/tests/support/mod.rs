//! Shared doubles and harnesses for the daemon test suites.

mod config_loader;
mod harness;
mod recorder;
mod shutdown;

pub(crate) use config_loader::{FailingConfigLoader, TestConfigLoader};
pub(crate) use harness::DriverHarness;
pub(crate) use recorder::{DriverEvent, Recorder};
pub(crate) use shutdown::TestShutdownSignal;
