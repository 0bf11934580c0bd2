//! Client library and command-line runtime for the glowpipe driver.
//!
//! [`DriverClient`] speaks the framed protocol over the configured endpoint.
//! [`run`] wraps it for the `glowpipe` binary: configuration flags ahead of
//! the subcommand go to the shared loader, the rest to clap, and the outcome
//! is written to the supplied streams so tests can capture it.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod client;
mod command;
mod config;
mod errors;
mod transport;

pub use client::DriverClient;
pub use errors::ClientError;
pub use transport::CONNECTION_TIMEOUT;

use cli::Cli;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
use errors::AppError;

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
}

impl<W, E, L> CliRunner<'_, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let cli = match Cli::try_parse_from(&split.command_arguments) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                return match write!(self.stdout, "{error}") {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(_) => ExitCode::FAILURE,
                };
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        match self.execute(&cli, &split.config_arguments) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => self.fail(&error),
        }
    }

    fn execute(&mut self, cli: &Cli, config_arguments: &[OsString]) -> Result<(), AppError> {
        let config = self.loader.load(config_arguments)?;
        let endpoint = config.daemon_socket()?;
        let mut client = DriverClient::connect(&endpoint)?;
        command::execute(&cli.command, &mut client, self.stdout)
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        drop(writeln!(self.stderr, "{error}"));
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner {
        stdout,
        stderr,
        loader,
    }
    .run(args)
}

#[cfg(test)]
mod tests;
