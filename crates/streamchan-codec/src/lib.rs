//! Self-describing packet envelope, type registry and framing for streamchan.
//!
//! Every value crossing a stream travels as one [`Packet`]: the wire name of
//! its registered type plus a JSON body, preceded by a 6-byte frame header:
//! - A 2-byte magic number ("SC") for stream synchronization
//! - A 4-byte little-endian body length
//!
//! Types must be registered in a [`TypeRegistry`] on both ends before they
//! are first sent. There is no schema negotiation.

pub mod codec;
pub mod error;
pub mod packet;
pub mod reader;
pub mod registry;
pub mod value;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_io;

#[cfg(feature = "async")]
pub use async_io::{AsyncPacketReader, AsyncPacketWriter};
pub use codec::{decode_frame, encode_frame, PacketConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{CodecError, ErrorKind, RegistryError, Result};
pub use packet::Packet;
pub use reader::PacketReader;
pub use registry::TypeRegistry;
pub use value::Value;
pub use writer::PacketWriter;
