//! Executes a parsed subcommand against a connected driver.

use std::io::Write;

use glowpipe_protocol::StatusReport;

use crate::cli::CliCommand;
use crate::client::DriverClient;
use crate::errors::AppError;

pub(crate) fn execute<W>(
    command: &CliCommand,
    client: &mut DriverClient,
    stdout: &mut W,
) -> Result<(), AppError>
where
    W: Write,
{
    match command {
        CliCommand::Ping => {
            client.ping()?;
            writeln!(stdout, "pong").map_err(AppError::Output)
        }
        CliCommand::Status { json } => {
            let report = client.status()?;
            write_status(&report, *json, stdout)
        }
        CliCommand::Brightness { level } => {
            client.set_brightness(*level)?;
            writeln!(stdout, "brightness set to {level}").map_err(AppError::Output)
        }
        CliCommand::Colors { colors } => {
            client.set_led_colors(colors)?;
            writeln!(stdout, "sent {} colours", colors.len()).map_err(AppError::Output)
        }
    }
}

fn write_status<W>(report: &StatusReport, json: bool, stdout: &mut W) -> Result<(), AppError>
where
    W: Write,
{
    if json {
        let payload = report.to_payload().map_err(AppError::RenderStatus)?;
        stdout.write_all(&payload).map_err(AppError::Output)?;
        return writeln!(stdout).map_err(AppError::Output);
    }
    writeln!(stdout, "status: {}", report.status).map_err(AppError::Output)?;
    writeln!(stdout, "connected clients: {}", report.connected_clients).map_err(AppError::Output)
}
