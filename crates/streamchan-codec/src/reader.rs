use std::io::{ErrorKind, Read};
use std::sync::Arc;

use bytes::BytesMut;

use crate::codec::{decode_frame, PacketConfig};
use crate::error::{CodecError, Result};
use crate::packet::Packet;
use crate::registry::TypeRegistry;
use crate::value::Value;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete packets from any blocking `Read` stream.
///
/// Partial reads are buffered until a whole frame is available.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    registry: Arc<TypeRegistry>,
    config: PacketConfig,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T, registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(inner, registry, PacketConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, registry: Arc<TypeRegistry>, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            registry,
            config,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(CodecError::EndOfStream)` when EOF falls on a packet
    /// boundary and `Err(CodecError::Truncated)` when it does not.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(body) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Packet::from_slice(&body);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
            };

            if read == 0 {
                return Err(match self.buf.len() {
                    0 => CodecError::EndOfStream,
                    buffered => CodecError::Truncated { buffered },
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next packet and unwrap its value.
    pub fn read_value(&mut self) -> Result<Value> {
        let packet = self.read_packet()?;
        self.registry.decode(packet)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
