//! Shared fixtures for the CLI test suites.

mod fake_driver;

use std::ffi::OsString;

use glowpipe_config::Config;

use crate::config::ConfigLoader;
use crate::errors::AppError;

pub(crate) use fake_driver::{FakeDriver, Reply};

/// Loader that ignores the environment and returns a fixed configuration.
pub(crate) struct StaticLoader(pub(crate) Config);

impl ConfigLoader for StaticLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.0.clone())
    }
}

/// Output captured from one CLI run.
#[derive(Debug)]
pub(crate) struct CliOutcome {
    pub(crate) exit: std::process::ExitCode,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

pub(crate) fn run_cli(config: Config, args: &[&str]) -> CliOutcome {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = std::iter::once("glowpipe")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = crate::run_with_loader(argv, &mut stdout, &mut stderr, &StaticLoader(config));
    CliOutcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout is UTF-8"),
        stderr: String::from_utf8(stderr).expect("stderr is UTF-8"),
    }
}
