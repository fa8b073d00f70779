//! Runs the wrapped command.

use std::{
    io,
    process::{Command, ExitStatus},
};

use log::debug;
use thiserror::Error;

/// Exit code when the command could not be started, as shells report it.
pub const EXIT_NOT_STARTED: u8 = 127;
/// Exit code when no command was given.
pub const EXIT_NO_COMMAND: u8 = 2;
/// Exit code for every other fatal error.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("No command specified")]
    NoCommand,

    #[error("Failed to execute '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs `command` with the parent's environment plus `env`, whose entries win over
/// inherited variables of the same name. Standard streams are inherited.
pub fn run<'a, I>(command: &[String], env: I) -> Result<ExitStatus, ExecError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let Some((program, args)) = command.split_first() else {
        return Err(ExecError::NoCommand);
    };

    debug!("Executing {program} with {} argument(s)", args.len());
    Command::new(program)
        .args(args)
        .envs(env)
        .status()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })
}

/// Exit code the wrapper reports when it fails before the child could exit on its own.
pub fn failure_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ExecError>() {
        Some(ExecError::Spawn { .. }) => EXIT_NOT_STARTED,
        Some(ExecError::NoCommand) => EXIT_NO_COMMAND,
        None => EXIT_FAILURE,
    }
}

/// Exit code the wrapper should report for the child's `status`.
///
/// Signals map to `128 + signal` as shells do.
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return u8::try_from(128 + signal).unwrap_or(1);
        }
    }

    1
}
