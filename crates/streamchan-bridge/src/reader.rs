use std::sync::Arc;

use streamchan_codec::{AsyncPacketReader, TypeRegistry, Value};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::DropGuard;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::exit::{Exit, ExitReason};
use crate::fault::{Action, Direction, FaultObserver, FaultTracker};
use crate::retry::RetryPolicy;
use crate::shutdown::Shutdown;

/// Decodes packets from a stream and delivers the values on a channel.
///
/// The decode loop runs on its own task from construction until the stream
/// ends, every receiver of the delivery channel is dropped, a fatal fault occurs, or
/// [`close`](Self::close) is called. Dropping the handle also closes it.
pub struct Reader {
    incoming: Option<mpsc::Receiver<Value>>,
    shutdown: Shutdown,
    task: JoinHandle<Exit>,
    _guard: DropGuard,
}

impl Reader {
    /// Start a reader with its own delivery channel.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<S>(stream: S, registry: Arc<TypeRegistry>) -> Self
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        Self::builder(registry).spawn(stream)
    }

    /// Start a reader that delivers on a caller-supplied channel.
    ///
    /// The reader drops its sender when it exits; the channel closes once
    /// every other sender is gone too.
    pub fn with_channel<S>(
        stream: S,
        registry: Arc<TypeRegistry>,
        delivery: mpsc::Sender<Value>,
    ) -> Self
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        Self::builder(registry).spawn_with_channel(stream, delivery)
    }

    pub fn builder(registry: Arc<TypeRegistry>) -> ReaderBuilder {
        ReaderBuilder {
            registry,
            config: BridgeConfig::default(),
            parent: None,
            observer: None,
        }
    }

    /// Receive the next value from the owned channel.
    ///
    /// Returns `None` once the reader has exited and the channel is drained,
    /// or if the channel was supplied externally or already taken.
    pub async fn recv(&mut self) -> Option<Value> {
        match self.incoming.as_mut() {
            Some(incoming) => incoming.recv().await,
            None => None,
        }
    }

    /// Take the owned receiving end, if there still is one.
    ///
    /// The handle must outlive the receiver. Dropping it closes the bridge,
    /// so calling this on a temporary yields a receiver that ends at once.
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use streamchan_bridge::{Reader, TypeRegistry};
    /// # async fn consume(stream: tokio::io::DuplexStream) {
    /// let mut reader = Reader::new(stream, Arc::new(TypeRegistry::new()));
    /// let mut incoming = reader.take_incoming().expect("owned channel");
    /// while let Some(value) = incoming.recv().await {
    ///     println!("{}", value.type_name());
    /// }
    /// drop(reader);
    /// # }
    /// ```
    pub fn take_incoming(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.incoming.take()
    }

    /// Ask the decode loop to stop. Idempotent.
    pub fn close(&self) {
        self.shutdown.trigger();
    }

    /// Returns true once the decode loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the decode loop to exit.
    ///
    /// Any owned receiver still held by the handle is dropped first. If no
    /// other receiver remains, the loop exits with
    /// [`ExitReason::Disconnected`] whether it was waiting on the stream or
    /// on delivery.
    pub async fn join(self) -> Result<Exit> {
        let Reader {
            incoming,
            task,
            _guard,
            ..
        } = self;
        drop(incoming);
        Ok(task.await?)
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("owns_channel", &self.incoming.is_some())
            .field("closed", &self.shutdown.is_triggered())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Configures a [`Reader`] before it starts.
pub struct ReaderBuilder {
    registry: Arc<TypeRegistry>,
    config: BridgeConfig,
    parent: Option<Shutdown>,
    observer: Option<FaultObserver>,
}

impl ReaderBuilder {
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Capacity of the owned delivery channel.
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

    /// Start the reader with an owned delivery channel.
    pub fn spawn<S>(self, stream: S) -> Reader
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.capacity());
        let mut reader = self.spawn_with_channel(stream, tx);
        reader.incoming = Some(rx);
        reader
    }

    /// Start the reader delivering on `delivery`.
    pub fn spawn_with_channel<S>(self, stream: S, delivery: mpsc::Sender<Value>) -> Reader
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        let shutdown = match &self.parent {
            Some(parent) => parent.child(),
            None => Shutdown::new(),
        };
        let faults = FaultTracker::new(Direction::Read, self.config.retry.clone(), self.observer);
        let packets = AsyncPacketReader::with_config(stream, self.config.packet_config());

        let task = tokio::spawn(read_loop(
            packets,
            self.registry,
            delivery,
            shutdown.clone(),
            faults,
        ));

        Reader {
            incoming: None,
            _guard: shutdown.drop_guard(),
            shutdown,
            task,
        }
    }
}

async fn read_loop<S>(
    mut packets: AsyncPacketReader<S>,
    registry: Arc<TypeRegistry>,
    delivery: mpsc::Sender<Value>,
    shutdown: Shutdown,
    mut faults: FaultTracker,
) -> Exit
where
    S: AsyncRead + Unpin,
{
    let mut delivered = 0u64;

    let reason = loop {
        let read = tokio::select! {
            biased;
            _ = shutdown.triggered() => break ExitReason::Shutdown,
            _ = delivery.closed() => break ExitReason::Disconnected,
            read = packets.read_packet() => read,
        };

        let value = match read.and_then(|packet| registry.decode(packet)) {
            Ok(value) => value,
            Err(err) => match faults.classify(err) {
                Action::Skip => continue,
                Action::Retry(delay) => {
                    if !shutdown.sleep(delay).await {
                        break ExitReason::Shutdown;
                    }
                    continue;
                }
                Action::Stop(reason) => break reason,
            },
        };

        let type_name = value.type_name();
        tokio::select! {
            biased;
            _ = shutdown.triggered() => break ExitReason::Shutdown,
            sent = delivery.send(value) => {
                if sent.is_err() {
                    break ExitReason::Disconnected;
                }
            }
        }

        faults.reset();
        delivered += 1;
        trace!(type_name, delivered, "delivered value");
    };

    debug!(
        ?reason,
        delivered,
        buffered = packets.buffered(),
        "reader loop exited"
    );
    faults.into_exit(reason, delivered)
}
