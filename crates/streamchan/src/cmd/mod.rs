use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send values to a listening peer.
    Send(SendArgs),
    /// Accept one peer and print every value it sends.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How `send` interprets its positional values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ValueKind {
    /// Any JSON document, sent as type `json`.
    Json,
    /// A UTF-8 string, sent as type `string`.
    Text,
    /// A signed 64-bit integer, sent as type `i64`.
    Int,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Values to send, in order.
    #[arg(required = true, num_args = 1.., value_name = "VALUE", allow_negative_numbers = true)]
    pub values: Vec<String>,
    /// How to interpret each value.
    #[arg(long, short = 'k', value_enum, default_value = "json")]
    pub kind: ValueKind,
    /// Give up connecting after this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub connect_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Exit after receiving N values (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
    /// Give up if no peer connects within this long (e.g. 30s, 500ms).
    #[arg(long, value_parser = parse_duration)]
    pub accept_timeout: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}

/// Current-thread runtime for a single command.
pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let (digits, to_duration): (&str, fn(u64) -> Duration) =
        match input.strip_suffix("ms") {
            Some(millis) => (millis, Duration::from_millis),
            None => (input.strip_suffix('s').unwrap_or(input), Duration::from_secs),
        };

    match digits.parse::<u64>() {
        Ok(0) => Err("duration must be greater than zero".to_string()),
        Ok(n) => Ok(to_duration(n)),
        Err(_) => Err(format!("invalid duration: {input:?}")),
    }
}
