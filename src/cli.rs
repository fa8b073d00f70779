//! Command-line interface definitions.

use clap::{ArgAction, Parser};

/// Run a command with MFA-authenticated AWS session credentials.
///
/// Long-term credentials and the session credentials derived from them are kept
/// in the OS keychain, so the MFA code is only requested when the cached session
/// has expired. The session (or assumed role) credentials are exported to the
/// command as AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and AWS_SESSION_TOKEN.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// AWS region used for STS requests
    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "us-west-2")]
    pub region: String,

    /// IAM role ARN to assume with the session credentials
    #[arg(long)]
    pub role: Option<String>,

    /// Session name for the assumed role [default: aws-mfa-<unix time>]
    #[arg(long, requires = "role")]
    pub role_session_name: Option<String>,

    /// Session duration in seconds (900-129600)
    #[arg(
        short,
        long,
        env = "AWS_SESSION_DURATION",
        default_value = "43200",
        value_parser = clap::value_parser!(u32).range(900..=129600)
    )]
    pub duration: u32,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// The command to execute
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
