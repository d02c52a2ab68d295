use std::fmt;
use std::io;

use streamchan_bridge::{BridgeError, Exit, ExitReason};
use streamchan_codec::{CodecError, ErrorKind};

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    match err {
        CodecError::Io(source) => io_error(context, source),
        other => {
            let code = match other.kind() {
                ErrorKind::Encode | ErrorKind::Decode => DATA_INVALID,
                ErrorKind::EndOfStream => TRANSPORT_ERROR,
                ErrorKind::Io => INTERNAL,
            };
            CliError::new(code, format!("{context}: {other}"))
        }
    }
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Closed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        BridgeError::Join(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

/// Turn a bridge report into a process exit code.
pub fn exit_report(context: &str, exit: &Exit) -> CliResult<i32> {
    if exit.is_clean() {
        return Ok(SUCCESS);
    }

    let detail = exit
        .last_fault
        .as_ref()
        .map(|fault| fault.message.as_str())
        .unwrap_or("no fault recorded");
    let code = match (exit.reason, exit.last_fault.as_ref().map(|fault| fault.kind)) {
        (ExitReason::Fatal, Some(ErrorKind::Io)) => TRANSPORT_ERROR,
        (ExitReason::Fatal | ExitReason::FaultLimit, _) => DATA_INVALID,
        _ => FAILURE,
    };
    Err(CliError::new(
        code,
        format!("{context}: {:?} after {} faults: {detail}", exit.reason, exit.faults),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_transport_codes() {
        let err = io_error("connect failed", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("connect failed: "));

        let err = io_error("bind failed", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn packet_errors_are_data_invalid() {
        let err = codec_error("encode failed", CodecError::UnregisteredType("Cat"));
        assert_eq!(err.code, DATA_INVALID);
        let err = codec_error("read failed", CodecError::InvalidMagic);
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn clean_exits_succeed() {
        let exit = Exit {
            reason: ExitReason::EndOfStream,
            transferred: 2,
            faults: 1,
            last_fault: None,
        };
        assert_eq!(exit_report("reader", &exit).expect("clean exit"), SUCCESS);
    }

    #[test]
    fn fault_limit_is_data_invalid() {
        let exit = Exit {
            reason: ExitReason::FaultLimit,
            transferred: 0,
            faults: 17,
            last_fault: None,
        };
        let err = exit_report("reader", &exit).expect_err("fault limit should fail");
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("17 faults"));
    }
}
