//! Error types for container metadata operations.

use std::fmt;

use nbl_bytes::ByteError;

/// Result type for container metadata operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur while reading or writing container metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// Byte-level cursor error.
    Bytes(ByteError),

    /// File does not start with the `NEBULAFX` magic.
    BadMagic {
        /// The eight bytes actually found.
        found: [u8; 8],
    },

    /// Container version is not supported.
    UnsupportedVersion {
        /// The version actually found.
        found: u16,
    },

    /// Attributes bitmask is not the required Alpha+Size combination.
    UnsupportedAttributes {
        /// The bitmask actually found.
        found: u16,
    },

    /// Reserved header bytes are not zero.
    MalformedHeader,

    /// Texture entry carries a zero row or column count.
    MalformedTexture {
        /// Index of the offending entry in the texture block.
        index: usize,
    },

    /// Frame index entry escapes the file or overlaps a neighbor.
    BadIndex {
        /// Frame whose index entry is invalid.
        frame: u32,
        /// What is wrong with the entry.
        fault: IndexFault,
    },

    /// Keyframe table violates its ordering or range rules.
    BadKeyframeTable {
        /// What is wrong with the table.
        fault: KeyframeFault,
    },

    /// A decode-side resource limit was exceeded.
    LimitExceeded {
        /// Which limit was exceeded.
        kind: LimitKind,
        /// The configured ceiling.
        limit: u64,
        /// The value actually encountered.
        actual: u64,
    },
}

/// Specific faults in a frame index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFault {
    /// Chunk offset points into the metadata region.
    BeforeDataStart { offset: u64, data_start: u64 },
    /// Chunk extends past the end of the file.
    PastEndOfFile { end: u64, file_size: u64 },
    /// Chunk overlaps the previous entry.
    Overlap { offset: u64, previous_end: u64 },
}

/// Specific faults in the keyframe table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeFault {
    /// Table is empty while the animation has frames.
    Empty,
    /// Table claims more keyframes than the animation has frames.
    TooMany { count: u32, total_frames: u32 },
    /// First entry is not frame 0.
    MissingFrameZero { first: u32 },
    /// Entries are not strictly ascending.
    NotAscending { position: usize, previous: u32, current: u32 },
    /// Entry indexes past the last frame.
    OutOfRange { position: usize, frame: u32, total_frames: u32 },
}

/// Decode-side limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    TextureBlockBytes,
    TotalFrames,
    ChunkBytes,
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(e) => write!(f, "byte cursor error: {e}"),
            Self::BadMagic { found } => {
                write!(f, "bad magic {:02X?}, expected \"NEBULAFX\"", found)
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported container version {found}")
            }
            Self::UnsupportedAttributes { found } => {
                write!(f, "unsupported attributes bitmask 0x{found:04X}, expected 0x0003")
            }
            Self::MalformedHeader => {
                write!(f, "reserved header bytes are not zero")
            }
            Self::MalformedTexture { index } => {
                write!(f, "texture entry {index} has a zero row or column count")
            }
            Self::BadIndex { frame, fault } => {
                write!(f, "frame index entry {frame}: {fault}")
            }
            Self::BadKeyframeTable { fault } => {
                write!(f, "keyframe table: {fault}")
            }
            Self::LimitExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
        }
    }
}

impl fmt::Display for IndexFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeDataStart { offset, data_start } => {
                write!(f, "offset {offset} is before the data region at {data_start}")
            }
            Self::PastEndOfFile { end, file_size } => {
                write!(f, "chunk ends at {end}, past the {file_size}-byte file")
            }
            Self::Overlap { offset, previous_end } => {
                write!(f, "offset {offset} overlaps the previous chunk ending at {previous_end}")
            }
        }
    }
}

impl fmt::Display for KeyframeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty while the animation has frames"),
            Self::TooMany {
                count,
                total_frames,
            } => {
                write!(f, "{count} keyframes exceed the {total_frames}-frame animation")
            }
            Self::MissingFrameZero { first } => {
                write!(f, "first entry is {first}, expected frame 0")
            }
            Self::NotAscending {
                position,
                previous,
                current,
            } => {
                write!(f, "entry {position} is {current}, not above previous {previous}")
            }
            Self::OutOfRange {
                position,
                frame,
                total_frames,
            } => {
                write!(f, "entry {position} indexes frame {frame} of {total_frames}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextureBlockBytes => "texture block bytes",
            Self::TotalFrames => "total frames",
            Self::ChunkBytes => "chunk bytes",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bytes(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ByteError> for ContainerError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}
