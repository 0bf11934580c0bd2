//! Command-line argument definitions for the `glowpipe` binary.

use clap::{Parser, Subcommand};

use glowpipe_protocol::Rgb;

/// Sends lighting commands to a running glowpipe driver.
#[derive(Parser, Debug)]
#[command(name = "glowpipe", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Driver commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub(crate) enum CliCommand {
    /// Checks that the driver answers.
    Ping,
    /// Prints the driver status and connected client count.
    Status {
        /// Prints the raw JSON report.
        #[arg(long)]
        json: bool,
    },
    /// Sets the device brightness.
    Brightness {
        /// Level between 0 and 1.
        #[arg(value_name = "LEVEL", value_parser = parse_level)]
        level: f32,
    },
    /// Sends one frame of colours, one `RRGGBB` value per LED.
    Colors {
        /// Hex colours such as `ff8000` or `#ff8000`.
        #[arg(value_name = "RRGGBB", required = true, num_args = 1..)]
        colors: Vec<Rgb>,
    },
}

fn parse_level(text: &str) -> Result<f32, String> {
    let level: f32 = text
        .parse()
        .map_err(|_| format!("'{text}' is not a number"))?;
    if (0.0..=1.0).contains(&level) {
        Ok(level)
    } else {
        Err(format!("brightness {level} must be between 0 and 1"))
    }
}
