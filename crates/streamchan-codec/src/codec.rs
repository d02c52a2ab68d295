use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CodecError, Result};

/// Frame header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "SC" (0x53 0x43).
pub const MAGIC: [u8; 2] = [0x53, 0x43];

/// Default maximum packet body size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode one packet body into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────────────────────┐
/// │ Magic (2B)   │ Length    │ Body                     │
/// │ 0x53 0x43    │ (4B LE)   │ (Length bytes of JSON)   │
/// │ "SC"         │           │                          │
/// └──────────────┴───────────┴──────────────────────────┘
/// ```
pub fn encode_frame(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > u32::MAX as usize {
        return Err(CodecError::PayloadTooLarge {
            size: body.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(body.len() as u32);
    dst.put_slice(body);
    Ok(())
}

/// Decode one frame body from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(CodecError::InvalidMagic);
    }

    let body_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if body_len > max_payload {
        return Err(CodecError::PayloadTooLarge {
            size: body_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + body_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(body_len).freeze()))
}

/// Configuration shared by packet readers and writers.
#[derive(Debug, Clone)]
pub struct PacketConfig {
    /// Maximum packet body size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_frame() {
        let mut buf = BytesMut::new();
        let body = br#"{"type":"i64","value":1}"#;

        encode_frame(body, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + body.len());

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.as_ref(), body);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x53, 0x43, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_body() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0x49, 0x50, 0x00, 0x00, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(CodecError::InvalidMagic)));
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(1024 * 1024 * 32);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(
            result,
            Err(CodecError::PayloadTooLarge { size, max })
                if size == 32 * 1024 * 1024 && max == DEFAULT_MAX_PAYLOAD
        ));
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_body() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();

        let body = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(body.is_empty());
    }
}
