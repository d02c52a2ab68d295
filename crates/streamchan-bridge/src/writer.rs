use std::sync::Arc;

use streamchan_codec::{AsyncPacketWriter, TypeRegistry, Value};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::DropGuard;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::exit::{Exit, ExitReason};
use crate::fault::{Action, Direction, FaultObserver, FaultTracker};
use crate::retry::RetryPolicy;
use crate::shutdown::Shutdown;

/// Encodes values received on a channel and writes them to a stream.
///
/// The encode loop runs on its own task from construction until every
/// sender is dropped, the stream fails, or [`close`](Self::close) is called.
/// Values still queued when the writer is closed are discarded. Dropping the
/// handle also closes it.
pub struct Writer {
    outgoing: Option<mpsc::Sender<Value>>,
    shutdown: Shutdown,
    task: JoinHandle<Exit>,
    _guard: DropGuard,
}

impl Writer {
    /// Start a writer with its own channel, fed through [`send`](Self::send).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<S>(stream: S, registry: Arc<TypeRegistry>) -> Self
    where
        S: AsyncWrite + Unpin + Send + 'static,
    {
        Self::builder(registry).spawn(stream)
    }

    /// Start a writer that drains a caller-supplied channel.
    pub fn with_channel<S>(
        stream: S,
        registry: Arc<TypeRegistry>,
        outgoing: mpsc::Receiver<Value>,
    ) -> Self
    where
        S: AsyncWrite + Unpin + Send + 'static,
    {
        Self::builder(registry).spawn_with_channel(stream, outgoing)
    }

    pub fn builder(registry: Arc<TypeRegistry>) -> WriterBuilder {
        WriterBuilder {
            registry,
            config: BridgeConfig::default(),
            parent: None,
            observer: None,
        }
    }

    /// Queue a value for writing, waiting for channel capacity.
    ///
    /// Fails with [`BridgeError::Closed`] if the writer was closed, has
    /// exited, or was built on an external channel. A value queued
    /// concurrently with [`close`](Self::close) may or may not be written.
    pub async fn send(&self, value: Value) -> Result<()> {
        if self.shutdown.is_triggered() {
            return Err(BridgeError::Closed);
        }
        let outgoing = self.outgoing.as_ref().ok_or(BridgeError::Closed)?;
        tokio::select! {
            biased;
            _ = self.shutdown.triggered() => Err(BridgeError::Closed),
            sent = outgoing.send(value) => sent.map_err(|_| BridgeError::Closed),
        }
    }

    /// A clone of the owned sender, for feeding the writer from other tasks.
    pub fn sender(&self) -> Option<mpsc::Sender<Value>> {
        self.outgoing.clone()
    }

    /// Ask the encode loop to stop. Idempotent.
    pub fn close(&self) {
        self.shutdown.trigger();
    }

    /// Returns true once the encode loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the encode loop to exit.
    ///
    /// The handle's own sender is dropped first, so without a `close` the
    /// loop drains whatever is queued and exits with
    /// [`ExitReason::Disconnected`] once every cloned sender is gone too.
    pub async fn join(self) -> Result<Exit> {
        let Writer {
            outgoing,
            task,
            _guard,
            ..
        } = self;
        drop(outgoing);
        Ok(task.await?)
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("owns_channel", &self.outgoing.is_some())
            .field("closed", &self.shutdown.is_triggered())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Configures a [`Writer`] before it starts.
pub struct WriterBuilder {
    registry: Arc<TypeRegistry>,
    config: BridgeConfig,
    parent: Option<Shutdown>,
    observer: Option<FaultObserver>,
}

impl WriterBuilder {
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Capacity of the owned channel.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.config.max_payload_size = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Leave the write half of the stream open when the loop exits.
    pub fn keep_stream_open(mut self) -> Self {
        self.config.shutdown_stream_on_exit = false;
        self
    }

    /// Also stop when `parent` is triggered.
    pub fn with_shutdown(mut self, parent: &Shutdown) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Report every fault on `observer`.
    pub fn with_fault_observer(mut self, observer: FaultObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start the writer with an owned channel.
    pub fn spawn<S>(self, stream: S) -> Writer
    where
        S: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.capacity());
        let mut writer = self.spawn_with_channel(stream, rx);
        writer.outgoing = Some(tx);
        writer
    }

    /// Start the writer draining `outgoing`.
    pub fn spawn_with_channel<S>(self, stream: S, outgoing: mpsc::Receiver<Value>) -> Writer
    where
        S: AsyncWrite + Unpin + Send + 'static,
    {
        let shutdown = match &self.parent {
            Some(parent) => parent.child(),
            None => Shutdown::new(),
        };
        let faults = FaultTracker::new(Direction::Write, self.config.retry.clone(), self.observer);
        let packets = AsyncPacketWriter::with_config(stream, self.config.packet_config());

        let task = tokio::spawn(write_loop(
            packets,
            self.registry,
            outgoing,
            shutdown.clone(),
            faults,
            self.config.shutdown_stream_on_exit,
        ));

        Writer {
            outgoing: None,
            _guard: shutdown.drop_guard(),
            shutdown,
            task,
        }
    }
}

async fn write_loop<S>(
    mut packets: AsyncPacketWriter<S>,
    registry: Arc<TypeRegistry>,
    mut outgoing: mpsc::Receiver<Value>,
    shutdown: Shutdown,
    mut faults: FaultTracker,
    shutdown_stream: bool,
) -> Exit
where
    S: AsyncWrite + Unpin,
{
    let mut written = 0u64;

    let reason = 'run: loop {
        let value = tokio::select! {
            biased;
            _ = shutdown.triggered() => break ExitReason::Shutdown,
            value = outgoing.recv() => match value {
                Some(value) => value,
                None => break ExitReason::Disconnected,
            },
        };

        // Writes are never raced against shutdown so frames go out whole.
        let mut result = match registry.encode(&value) {
            Ok(packet) => packets.write_packet(&packet).await,
            Err(err) => Err(err),
        };

        loop {
            let err = match result {
                Ok(()) => {
                    faults.reset();
                    written += 1;
                    trace!(type_name = value.type_name(), written, "wrote value");
                    break;
                }
                Err(err) => err,
            };
            match faults.classify(err) {
                Action::Skip => break,
                Action::Retry(delay) => {
                    if !shutdown.sleep(delay).await {
                        break 'run ExitReason::Shutdown;
                    }
                    result = packets.write_pending().await;
                }
                Action::Stop(reason) => break 'run reason,
            }
        }
    };

    if shutdown_stream {
        if let Err(err) = packets.shutdown().await {
            debug!(error = %err, "stream shutdown failed");
        }
    }

    debug!(
        ?reason,
        written,
        abandoned = packets.has_pending(),
        "writer loop exited"
    );
    faults.into_exit(reason, written)
}
