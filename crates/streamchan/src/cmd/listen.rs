use streamchan_bridge::Shutdown;

use crate::cmd::ListenArgs;
use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

#[cfg(unix)]
pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let shutdown = Shutdown::new();
    install_ctrlc_handler(shutdown.clone())?;
    super::runtime()?.block_on(unix::listen(&args, format, &shutdown))
}

#[cfg(not(unix))]
pub fn run(_args: ListenArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(CliError::new(
        crate::exit::FAILURE,
        "listen requires Unix domain sockets",
    ))
}

/// Ctrl-C triggers the same signal the reader is built on.
fn install_ctrlc_handler(shutdown: Shutdown) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.trigger())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(unix)]
mod unix {
    use std::os::unix::fs::FileTypeExt;
    use std::path::Path;
    use std::sync::Arc;

    use streamchan_bridge::{Reader, Shutdown};
    use streamchan_codec::TypeRegistry;
    use tokio::net::{UnixListener, UnixStream};
    use tracing::{debug, info};

    use crate::cmd::ListenArgs;
    use crate::exit::{
        bridge_error, codec_error, exit_report, io_error, CliError, CliResult, SUCCESS, TIMEOUT,
    };
    use crate::output::{print_packet, OutputFormat};

    pub(super) async fn listen(
        args: &ListenArgs,
        format: OutputFormat,
        shutdown: &Shutdown,
    ) -> CliResult<i32> {
        remove_stale_socket(&args.path)?;
        let listener =
            UnixListener::bind(&args.path).map_err(|err| io_error("bind failed", err))?;
        info!(path = %args.path.display(), "listening");

        let result = match accept(&listener, args, shutdown).await {
            Ok(Some(stream)) => receive(stream, args, format, shutdown).await,
            Ok(None) => Ok(SUCCESS),
            Err(err) => Err(err),
        };

        drop(listener);
        if let Err(err) = std::fs::remove_file(&args.path) {
            debug!(error = %err, "socket cleanup failed");
        }
        result
    }

    /// Wait for one peer. `None` means shutdown came first.
    async fn accept(
        listener: &UnixListener,
        args: &ListenArgs,
        shutdown: &Shutdown,
    ) -> CliResult<Option<UnixStream>> {
        let accepted = async {
            let accepted = match args.accept_timeout {
                Some(limit) => match tokio::time::timeout(limit, listener.accept()).await {
                    Ok(accepted) => accepted,
                    Err(_) => {
                        return Err(CliError::new(TIMEOUT, "no peer connected before timeout"))
                    }
                },
                None => listener.accept().await,
            };
            accepted.map_err(|err| io_error("accept failed", err))
        };

        tokio::select! {
            biased;
            _ = shutdown.triggered() => Ok(None),
            accepted = accepted => accepted.map(|(stream, _)| Some(stream)),
        }
    }

    async fn receive(
        stream: UnixStream,
        args: &ListenArgs,
        format: OutputFormat,
        shutdown: &Shutdown,
    ) -> CliResult<i32> {
        debug!("peer connected");
        let registry = Arc::new(TypeRegistry::new());
        let mut reader = Reader::builder(Arc::clone(&registry))
            .with_shutdown(shutdown)
            .spawn(stream);

        let mut received = 0u64;
        while let Some(value) = reader.recv().await {
            let packet = registry
                .encode(&value)
                .map_err(|err| codec_error("cannot print value", err))?;
            print_packet(&packet, format);
            received += 1;

            if args.count.is_some_and(|count| received >= count) {
                reader.close();
                break;
            }
        }

        let exit = reader
            .join()
            .await
            .map_err(|err| bridge_error("reader failed", err))?;
        info!(received, faults = exit.faults, reason = ?exit.reason, "peer finished");
        exit_report("receive failed", &exit)
    }

    /// A socket file left behind by an earlier run blocks `bind`.
    fn remove_stale_socket(path: &Path) -> CliResult<()> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_socket() => std::fs::remove_file(path)
                .map_err(|err| io_error("stale socket removal failed", err)),
            Ok(_) => Err(CliError::usage(format!(
                "{} exists and is not a socket",
                path.display()
            ))),
            Err(_) => Ok(()),
        }
    }
}
