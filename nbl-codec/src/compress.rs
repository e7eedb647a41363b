//! Single-shot Zstd wrapper for frame chunks.
//!
//! Every chunk is one self-contained Zstd frame over the concatenated
//! 5-byte frame header and payload. No dictionary or streaming context is
//! carried between chunks, so any chunk can be decompressed in isolation.

use std::io::Read;

use crate::error::{CodecError, CodecResult};

/// First four bytes of every Zstd frame, little-endian 0xFD2FB528.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Safety ceiling on the decompressed size of one frame chunk.
pub const MAX_FRAME_BYTES: usize = 256 * 1024 * 1024;

/// Default Zstd compression level for frame chunks.
pub const DEFAULT_LEVEL: i32 = 3;

/// Compresses one raw frame (header and payload together) in one shot.
///
/// # Errors
///
/// Returns [`CodecError::Io`] if the compressor fails.
pub fn compress_frame(raw: &[u8], level: i32) -> CodecResult<Vec<u8>> {
    zstd::stream::encode_all(raw, level).map_err(CodecError::Io)
}

/// Decompresses one chunk in one shot.
///
/// `frame` is only used to attribute errors.
///
/// # Errors
///
/// Returns [`CodecError::BadCompression`] if the input does not start with
/// the Zstd magic or is otherwise corrupt, and
/// [`CodecError::FrameTooLarge`] if the output would exceed `max_bytes`.
pub fn decompress_frame(compressed: &[u8], frame: u32, max_bytes: usize) -> CodecResult<Vec<u8>> {
    if compressed.len() < 4 || compressed[..4] != ZSTD_MAGIC {
        return Err(CodecError::BadCompression { frame });
    }

    let decoder = zstd::stream::read::Decoder::new(compressed)
        .map_err(|_| CodecError::BadCompression { frame })?;
    let mut raw = Vec::new();
    let cap = (max_bytes as u64).saturating_add(1);
    decoder
        .take(cap)
        .read_to_end(&mut raw)
        .map_err(|_| CodecError::BadCompression { frame })?;
    if raw.len() > max_bytes {
        return Err(CodecError::FrameTooLarge {
            frame,
            limit: max_bytes,
        });
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_decompress_roundtrip() {
        let raw = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = compress_frame(&raw, DEFAULT_LEVEL).unwrap();
        assert_eq!(&compressed[..4], &ZSTD_MAGIC);

        let decompressed = decompress_frame(&compressed, 0, MAX_FRAME_BYTES).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn empty_frame_roundtrip() {
        let compressed = compress_frame(&[], DEFAULT_LEVEL).unwrap();
        let decompressed = decompress_frame(&compressed, 0, MAX_FRAME_BYTES).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn chunks_are_independent() {
        // Identical inputs compress identically because no context is
        // carried between calls.
        let raw = b"independent chunk".to_vec();
        let first = compress_frame(&raw, DEFAULT_LEVEL).unwrap();
        let second = compress_frame(&raw, DEFAULT_LEVEL).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_missing_magic() {
        let err = decompress_frame(b"not zstd data", 7, MAX_FRAME_BYTES).unwrap_err();
        assert!(matches!(err, CodecError::BadCompression { frame: 7 }));
    }

    #[test]
    fn rejects_short_input() {
        let err = decompress_frame(&[0x28, 0xB5], 3, MAX_FRAME_BYTES).unwrap_err();
        assert!(matches!(err, CodecError::BadCompression { frame: 3 }));
    }

    #[test]
    fn rejects_truncated_stream() {
        let raw = vec![0xABu8; 4096];
        let compressed = compress_frame(&raw, DEFAULT_LEVEL).unwrap();
        let err =
            decompress_frame(&compressed[..compressed.len() / 2], 1, MAX_FRAME_BYTES).unwrap_err();
        assert!(matches!(err, CodecError::BadCompression { frame: 1 }));
    }

    #[test]
    fn enforces_size_ceiling() {
        let raw = vec![0u8; 1024];
        let compressed = compress_frame(&raw, DEFAULT_LEVEL).unwrap();
        let err = decompress_frame(&compressed, 2, 512).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FrameTooLarge {
                frame: 2,
                limit: 512
            }
        ));
    }

    #[test]
    fn ceiling_is_inclusive() {
        let raw = vec![0u8; 512];
        let compressed = compress_frame(&raw, DEFAULT_LEVEL).unwrap();
        let decompressed = decompress_frame(&compressed, 0, 512).unwrap();
        assert_eq!(decompressed.len(), 512);
    }
}
