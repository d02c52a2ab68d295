//! Packet I/O over Tokio streams.

use std::io::ErrorKind;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{decode_frame, encode_frame, PacketConfig};
use crate::error::{CodecError, Result};
use crate::packet::Packet;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete packets from an `AsyncRead` stream.
pub struct AsyncPacketReader<T> {
    inner: T,
    buf: BytesMut,
    config: PacketConfig,
}

impl<T: AsyncRead + Unpin> AsyncPacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete packet.
    ///
    /// Cancel safe: bytes read before the future is dropped stay buffered
    /// and are used by the next call.
    pub async fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(body) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Packet::from_slice(&body);
            }

            let read = match self.inner.read_buf(&mut self.buf).await {
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
        }
    }

    /// Bytes received but not yet returned as a packet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Writes complete packets to an `AsyncWrite` stream.
///
/// Bytes of a frame that could not be written stay pending, so a failed
/// write can be resumed with [`write_pending`](Self::write_pending) without
/// tearing the frame.
pub struct AsyncPacketWriter<T> {
    inner: T,
    pending: BytesMut,
    config: PacketConfig,
}

impl<T: AsyncWrite + Unpin> AsyncPacketWriter<T> {
    /// Create a new packet writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new packet writer with explicit configuration.
    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame a packet, write it and flush.
    pub async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let body = packet.to_bytes()?;
        if body.len() > self.config.max_payload_size {
            return Err(CodecError::PayloadTooLarge {
                size: body.len(),
                max: self.config.max_payload_size,
            });
        }

        encode_frame(&body, &mut self.pending)?;
        self.write_pending().await
    }

    /// Write whatever is left of earlier frames, then flush.
    pub async fn write_pending(&mut self) -> Result<()> {
        while self.pending.has_remaining() {
            match self.inner.write(&self.pending).await {
                Ok(0) => return Err(CodecError::EndOfStream),
                Ok(n) => self.pending.advance(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
            }
        }

        loop {
            match self.inner.flush().await {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
            }
        }
    }

    /// True if part of a frame is still waiting to be written.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flush and shut down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(CodecError::Io)
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
