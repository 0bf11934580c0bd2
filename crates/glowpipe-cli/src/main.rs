//! Command-line entrypoint for sending commands to the glowpipe driver.
//!
//! The binary delegates to [`glowpipe_cli::run`], which loads configuration,
//! parses the subcommand and talks to the configured driver endpoint.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    glowpipe_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
