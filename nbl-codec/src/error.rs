//! Error types for codec operations.

use std::fmt;

use nbl_bytes::ByteError;
use nbl_container::ContainerError;

use crate::types::{Axis, ParticleId};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while reading, writing, or transcoding an
/// animation.
///
/// Per-frame variants carry the index of the offending frame.
#[derive(Debug)]
pub enum CodecError {
    /// Container metadata error.
    Container(ContainerError),

    /// Byte-level cursor error.
    Bytes(ByteError),

    /// I/O error from the underlying source or sink.
    Io(std::io::Error),

    /// Chunk is not a valid single Zstd frame.
    BadCompression {
        /// Frame whose chunk failed to decompress.
        frame: u32,
    },

    /// Decompressed frame exceeds the safety ceiling.
    FrameTooLarge {
        /// Frame whose chunk is oversized.
        frame: u32,
        /// The configured ceiling in bytes.
        limit: usize,
    },

    /// Payload length does not match the particle count.
    PayloadSizeMismatch {
        /// Frame whose payload is malformed.
        frame: u32,
        /// Expected payload length in bytes.
        expected: u64,
        /// Actual payload length in bytes.
        actual: u64,
    },

    /// Frame type byte is neither I-frame nor P-frame.
    UnknownFrameType {
        /// Frame whose type byte is invalid.
        frame: u32,
        /// The type byte actually found.
        found: u8,
    },

    /// A frame listed in the keyframe table is not an I-frame.
    ExpectedKeyFrame {
        /// The offending frame.
        frame: u32,
    },

    /// The same particle ID appears twice in one frame.
    DuplicateParticleId {
        /// Frame carrying the duplicate.
        frame: u32,
        /// The duplicated ID.
        id: ParticleId,
    },

    /// Requested frame does not exist.
    FrameOutOfRange {
        /// The requested frame.
        frame: u32,
        /// Number of frames in the animation.
        total_frames: u32,
    },

    /// A quantized position delta exceeds the representable range and the
    /// encoder was configured not to force a keyframe.
    DeltaOverflow {
        /// Frame being encoded.
        frame: u32,
        /// Particle whose movement overflowed.
        id: ParticleId,
        /// Axis of the overflowing delta.
        axis: Axis,
        /// The quantized delta that did not fit.
        delta_q: i64,
    },

    /// More textures than the u16 header field can describe.
    TooManyTextures {
        /// Number of textures supplied.
        count: usize,
    },

    /// The writer was poisoned by an earlier failure or already finished.
    WriterClosed,

    /// The operation was cancelled via its [`CancelToken`](crate::CancelToken).
    Cancelled,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container(e) => write!(f, "container error: {e}"),
            Self::Bytes(e) => write!(f, "byte cursor error: {e}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::BadCompression { frame } => {
                write!(f, "frame {frame}: chunk is not a valid Zstd frame")
            }
            Self::FrameTooLarge { frame, limit } => {
                write!(f, "frame {frame}: decompressed size exceeds {limit} bytes")
            }
            Self::PayloadSizeMismatch {
                frame,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "frame {frame}: payload is {actual} bytes, expected {expected}"
                )
            }
            Self::UnknownFrameType { frame, found } => {
                write!(f, "frame {frame}: unknown frame type {found}")
            }
            Self::ExpectedKeyFrame { frame } => {
                write!(f, "frame {frame}: keyframe table entry is not an I-frame")
            }
            Self::DuplicateParticleId { frame, id } => {
                write!(f, "frame {frame}: duplicate particle id {id}")
            }
            Self::FrameOutOfRange {
                frame,
                total_frames,
            } => {
                write!(f, "frame {frame} out of range, animation has {total_frames}")
            }
            Self::DeltaOverflow {
                frame,
                id,
                axis,
                delta_q,
            } => {
                write!(
                    f,
                    "frame {frame}: particle {id} moved {delta_q} quantized units on {axis}, beyond +/-32767"
                )
            }
            Self::TooManyTextures { count } => {
                write!(f, "{count} textures exceed the u16 texture count")
            }
            Self::WriterClosed => {
                write!(f, "writer is poisoned or already finished")
            }
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Container(e) => Some(e),
            Self::Bytes(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ContainerError> for CodecError {
    fn from(err: ContainerError) -> Self {
        Self::Container(err)
    }
}

impl From<ByteError> for CodecError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
