//! Configuration loading helpers for the glowpipe CLI.
//!
//! Leading configuration flags are peeled off for `ortho_config` so the loader
//! only receives options it understands, while clap parses the remaining
//! subcommand tokens.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;

use glowpipe_config::Config;

use crate::errors::AppError;

/// Configuration flags accepted ahead of the subcommand.
///
/// Keep in sync with the fields of [`Config`] that affect the client.
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--daemon-socket", "--endpoint-name"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// Configuration flags must appear before the subcommand; anything after
    /// it is treated as a subcommand argument.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Arguments split between the configuration loader and clap.
///
/// Both vectors start with the program name.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut consumed = 0;
    let mut awaiting_value = false;
    for argument in rest {
        if awaiting_value {
            awaiting_value = false;
        } else {
            match classify(argument) {
                FlagAction::Include { needs_value } => awaiting_value = needs_value,
                FlagAction::Skip => break,
            }
        }
        config_arguments.push(argument.clone());
        consumed += 1;
    }

    let mut command_arguments = vec![program.clone()];
    command_arguments.extend(rest.iter().skip(consumed).cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}
