//! Bridges between byte streams and Tokio channels.
//!
//! A [`Reader`] decodes packets from an `AsyncRead` and delivers the values
//! on an `mpsc` channel. A [`Writer`] drains an `mpsc` channel and writes
//! each value as a packet to an `AsyncWrite`. Both run on their own task and
//! stop on a dedicated [`Shutdown`] signal, never by closing the data
//! channel.
//!
//! Faults that do not end the stream (an unknown type, a transient I/O
//! error) are logged, optionally reported to a fault observer, and handled
//! per the bridge's [`RetryPolicy`]. Every bridge finishes with an [`Exit`]
//! report.

pub mod config;
pub mod error;
pub mod exit;
pub mod fault;
pub mod reader;
pub mod retry;
pub mod shutdown;
pub mod writer;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use exit::{Exit, ExitReason};
pub use fault::{Direction, Fault, FaultObserver};
pub use reader::{Reader, ReaderBuilder};
pub use retry::RetryPolicy;
pub use shutdown::Shutdown;
pub use writer::{Writer, WriterBuilder};

pub use streamchan_codec::{TypeRegistry, Value};
