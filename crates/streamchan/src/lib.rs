//! Bridge byte streams and Tokio channels with self-describing packets.
//!
//! A [`Reader`] turns an `AsyncRead` into a stream of [`Value`]s on an
//! `mpsc` channel; a [`Writer`] does the reverse. Values cross the wire as
//! name-tagged JSON packets, so any type registered in a [`TypeRegistry`]
//! on both ends can be sent.
//!
//! # Crate Structure
//!
//! - [`codec`]: packet envelope, type registry and framing
//! - [`bridge`]: the Reader/Writer tasks, shutdown signal and fault policy

/// Re-export codec types.
pub mod codec {
    pub use streamchan_codec::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use streamchan_bridge::*;
}

pub use streamchan_bridge::{
    BridgeConfig, BridgeError, Exit, ExitReason, Fault, Reader, RetryPolicy, Shutdown, Writer,
};
pub use streamchan_codec::{CodecError, Packet, TypeRegistry, Value};
