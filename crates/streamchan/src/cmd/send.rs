use crate::cmd::{SendArgs, ValueKind};
use crate::exit::{CliError, CliResult};
use streamchan_codec::Value;

#[cfg(unix)]
pub fn run(args: SendArgs) -> CliResult<i32> {
    let values = parse_values(args.kind, &args.values)?;
    super::runtime()?.block_on(unix::send(&args, values))
}

#[cfg(not(unix))]
pub fn run(_args: SendArgs) -> CliResult<i32> {
    Err(CliError::new(
        crate::exit::FAILURE,
        "send requires Unix domain sockets",
    ))
}

/// Convert the command line values to their wire types before connecting.
fn parse_values(kind: ValueKind, raw: &[String]) -> CliResult<Vec<Value>> {
    raw.iter()
        .map(|text| match kind {
            ValueKind::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::new)
                .map_err(|err| CliError::usage(format!("{text:?} is not valid JSON: {err}"))),
            ValueKind::Text => Ok(Value::new(text.clone())),
            ValueKind::Int => text
                .parse::<i64>()
                .map(Value::new)
                .map_err(|err| CliError::usage(format!("{text:?} is not an integer: {err}"))),
        })
        .collect()
}

#[cfg(unix)]
mod unix {
    use std::sync::Arc;

    use streamchan_bridge::Writer;
    use streamchan_codec::{TypeRegistry, Value};
    use tokio::net::UnixStream;
    use tracing::{debug, info};

    use crate::cmd::SendArgs;
    use crate::exit::{bridge_error, exit_report, io_error, CliError, CliResult, SUCCESS, TIMEOUT};

    pub(super) async fn send(args: &SendArgs, values: Vec<Value>) -> CliResult<i32> {
        let stream = tokio::time::timeout(args.connect_timeout, UnixStream::connect(&args.path))
            .await
            .map_err(|_| {
                CliError::new(
                    TIMEOUT,
                    format!("connect to {} timed out", args.path.display()),
                )
            })?
            .map_err(|err| io_error("connect failed", err))?;
        debug!(path = %args.path.display(), "connected");

        let writer = Writer::new(stream, Arc::new(TypeRegistry::new()));
        let expected = values.len() as u64;
        for value in values {
            writer
                .send(value)
                .await
                .map_err(|err| bridge_error("send failed", err))?;
        }

        let exit = writer
            .join()
            .await
            .map_err(|err| bridge_error("writer failed", err))?;
        info!(sent = exit.transferred, reason = ?exit.reason, "writer finished");

        exit_report("send failed", &exit)?;
        if exit.transferred < expected {
            return Err(CliError::new(
                crate::exit::TRANSPORT_ERROR,
                format!(
                    "peer went away after {} of {expected} values",
                    exit.transferred
                ),
            ));
        }
        Ok(SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ints_parse_to_i64() {
        let values = parse_values(ValueKind::Int, &strings(&["1", "-7"])).expect("ints");
        assert_eq!(values[0].downcast_ref::<i64>(), Some(&1));
        assert_eq!(values[1].downcast_ref::<i64>(), Some(&-7));
    }

    #[test]
    fn json_parses_to_documents() {
        let values = parse_values(ValueKind::Json, &strings(&[r#"{"foo":1}"#])).expect("json");
        assert_eq!(
            values[0].downcast_ref::<serde_json::Value>(),
            Some(&serde_json::json!({"foo": 1}))
        );
    }

    #[test]
    fn text_is_taken_verbatim() {
        let values = parse_values(ValueKind::Text, &strings(&["{not json"])).expect("text");
        assert_eq!(
            values[0].downcast_ref::<String>().map(String::as_str),
            Some("{not json")
        );
    }

    #[test]
    fn bad_values_are_usage_errors() {
        let err = parse_values(ValueKind::Int, &strings(&["one"])).expect_err("not an int");
        assert_eq!(err.code, crate::exit::USAGE);
        let err = parse_values(ValueKind::Json, &strings(&["{"])).expect_err("not json");
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
