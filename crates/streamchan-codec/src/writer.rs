use std::io::{ErrorKind, Write};
use std::sync::Arc;

use bytes::BytesMut;

use crate::codec::{encode_frame, PacketConfig};
use crate::error::{CodecError, Result};
use crate::packet::Packet;
use crate::registry::TypeRegistry;
use crate::value::Value;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete packets to any blocking `Write` stream.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    registry: Arc<TypeRegistry>,
    config: PacketConfig,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer with default configuration.
    pub fn new(inner: T, registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(inner, registry, PacketConfig::default())
    }

    /// Create a new packet writer with explicit configuration.
    pub fn with_config(inner: T, registry: Arc<TypeRegistry>, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            registry,
            config,
        }
    }

    /// Wrap a value in a packet and write it (blocking).
    ///
    /// Encode failures are reported before any byte reaches the stream.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        let packet = self.registry.encode(value)?;
        self.write_packet(&packet)
    }

    /// Write a complete packet (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let body = packet.to_bytes()?;
        if body.len() > self.config.max_payload_size {
            return Err(CodecError::PayloadTooLarge {
                size: body.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(&body, &mut self.buf)?;

        let mut pending = &self.buf[..];
        while !pending.is_empty() {
            match self.inner.write(pending) {
                Ok(0) => return Err(CodecError::EndOfStream),
                Ok(n) => pending = &pending[n..],
                Err(err) if retry_in_place(err.kind()) => {}
                Err(err) => return Err(CodecError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if retry_in_place(err.kind()) => {}
                Err(err) => return Err(CodecError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Blocking writers spin on these instead of surfacing them.
fn retry_in_place(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::Interrupted | ErrorKind::WouldBlock)
}
