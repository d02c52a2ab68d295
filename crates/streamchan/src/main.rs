mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "streamchan", version, about = "Move typed values over Unix sockets")]
struct Cli {
    /// Output format for received values.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ValueKind;

    #[test]
    fn parses_send_with_several_values() {
        let cli = Cli::try_parse_from([
            "streamchan",
            "send",
            "/tmp/test.sock",
            "--kind",
            "int",
            "1",
            "-2",
            "3",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.kind, ValueKind::Int);
        assert_eq!(args.values, ["1", "-2", "3"]);
    }

    #[test]
    fn send_requires_a_value() {
        let err = Cli::try_parse_from(["streamchan", "send", "/tmp/test.sock"])
            .expect_err("missing values should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn parses_listen_with_global_flags() {
        let cli = Cli::try_parse_from([
            "streamchan",
            "listen",
            "/tmp/test.sock",
            "--count",
            "2",
            "--format",
            "json",
            "--log-level",
            "off",
        ])
        .expect("listen args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert_eq!(cli.log_level, LogLevel::Off);
        let Command::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.count, Some(2));
        assert!(args.accept_timeout.is_none());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Cli::try_parse_from([
            "streamchan",
            "listen",
            "/tmp/test.sock",
            "--accept-timeout",
            "0s",
        ])
        .expect_err("zero timeout should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_zero_count() {
        let err = Cli::try_parse_from(["streamchan", "listen", "/tmp/test.sock", "--count", "0"])
            .expect_err("zero count should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
