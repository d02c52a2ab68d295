use std::io;

/// Errors that can occur while encoding, decoding, or moving packets.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value's concrete type was never registered.
    #[error("cannot encode value of unregistered type {0}")]
    UnregisteredType(&'static str),

    /// The packet names a type this registry does not know.
    #[error("cannot decode packet of unregistered type {0:?}")]
    UnknownType(String),

    /// The value could not be serialized.
    #[error("failed to encode {type_name}: {source}")]
    Encode {
        type_name: String,
        source: serde_json::Error,
    },

    /// The packet body is malformed or does not match the named type.
    #[error("failed to decode packet: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x5343 \"SC\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The stream ended partway through a frame.
    #[error("stream ended inside a frame ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    /// The stream ended cleanly on a frame boundary.
    #[error("end of stream")]
    EndOfStream,

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Normal termination of a stream. Not a fault.
    EndOfStream,
    /// Malformed or unrecognized bytes.
    Decode,
    /// A value that cannot be put on the wire.
    Encode,
    /// Transient or fatal I/O fault.
    Io,
}

impl CodecError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::EndOfStream => ErrorKind::EndOfStream,
            CodecError::UnregisteredType(_) | CodecError::Encode { .. } => ErrorKind::Encode,
            CodecError::UnknownType(_)
            | CodecError::Decode(_)
            | CodecError::InvalidMagic
            | CodecError::PayloadTooLarge { .. }
            | CodecError::Truncated { .. } => ErrorKind::Decode,
            CodecError::Io(err) if is_disconnect(err.kind()) => ErrorKind::EndOfStream,
            CodecError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the stream is finished and no further packets can flow.
    pub fn is_end_of_stream(&self) -> bool {
        self.kind() == ErrorKind::EndOfStream
    }

    /// True when retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CodecError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// True when only the current packet is affected and the stream is
    /// still positioned on a frame boundary.
    pub fn is_packet_local(&self) -> bool {
        matches!(
            self,
            CodecError::UnregisteredType(_)
                | CodecError::UnknownType(_)
                | CodecError::Encode { .. }
                | CodecError::Decode(_)
        )
    }
}

/// The peer is gone: further writes cannot succeed.
fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WriteZero
            | io::ErrorKind::UnexpectedEof
    )
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur while registering value types.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Another type already uses this wire name.
    #[error("wire name {0:?} is already registered")]
    DuplicateName(String),

    /// The type is already registered under another name.
    #[error("type {type_name} is already registered as {registered_as:?}")]
    DuplicateType {
        type_name: &'static str,
        registered_as: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_taxonomy() {
        assert_eq!(CodecError::EndOfStream.kind(), ErrorKind::EndOfStream);
        assert_eq!(CodecError::UnregisteredType("Cat").kind(), ErrorKind::Encode);
        assert_eq!(CodecError::UnknownType("cat".into()).kind(), ErrorKind::Decode);
        assert_eq!(CodecError::InvalidMagic.kind(), ErrorKind::Decode);
        assert_eq!(
            CodecError::Io(io::Error::from(io::ErrorKind::PermissionDenied)).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn broken_pipe_is_end_of_stream() {
        let err = CodecError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.is_end_of_stream());
        assert!(!err.is_transient());
    }

    #[test]
    fn transient_io_kinds() {
        for kind in [
            io::ErrorKind::Interrupted,
            io::ErrorKind::WouldBlock,
            io::ErrorKind::TimedOut,
        ] {
            assert!(CodecError::Io(io::Error::from(kind)).is_transient());
        }
        assert!(!CodecError::Io(io::Error::from(io::ErrorKind::NotFound)).is_transient());
        assert!(!CodecError::InvalidMagic.is_transient());
    }

    #[test]
    fn packet_local_faults() {
        assert!(CodecError::UnknownType("x".into()).is_packet_local());
        assert!(!CodecError::Truncated { buffered: 3 }.is_packet_local());
        assert!(!CodecError::EndOfStream.is_packet_local());
    }
}
