//! AWS MFA command wrapper
//!
//! Runs a command with temporary, MFA-authenticated AWS credentials in its
//! environment. Long-term credentials and the session credentials obtained from
//! them are cached in the OS keychain, so the MFA code is only requested once per
//! session lifetime.
//!
//! For every invocation the program:
//! 1. Loads long-term credentials from the keychain, or collects them from the
//!    environment / the operator on first use
//! 2. Reuses the cached session credentials while they are valid, otherwise
//!    exchanges the long-term credentials and an MFA code for new ones
//! 3. Optionally assumes an IAM role with the session credentials
//! 4. Executes the command with the resulting credentials and exits with its status

use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use log::LevelFilter;

mod cache;
mod cli;
mod credentials;
mod exec;
mod orchestrator;
mod prompt;
mod store;
mod sts;

use cache::CredentialCache;
use cli::Args;
use orchestrator::{ChainOptions, CredentialOrchestrator};
use prompt::{Input, Terminal};
use store::KeyringStore;
use sts::StsExchange;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exec::failure_code(&e))
        }
    }
}

/// Logs go to stderr. `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_string().to_lowercase()),
    )
    .format_timestamp(None)
    .init();
}

async fn run(args: Args) -> Result<u8> {
    let Args {
        region,
        role,
        role_session_name,
        duration,
        verbose: _,
        command,
    } = args;

    // Environment snapshot used to skip prompts for long-term credentials.
    let overrides = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();

    let options = ChainOptions {
        duration,
        role,
        role_session_name: role_session_name
            .unwrap_or_else(|| format!("aws-mfa-{}", Utc::now().timestamp())),
    };
    let mut orchestrator = CredentialOrchestrator::new(
        CredentialCache::new(KeyringStore),
        Input::new(Terminal, overrides),
        StsExchange::new(region),
        options,
    );
    let credentials = orchestrator.resolve().await?;

    let status = exec::run(&command, credentials.env_vars())?;
    Ok(exec::exit_code(status))
}
