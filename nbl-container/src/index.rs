//! Frame and keyframe index table codecs.

use nbl_bytes::{ByteReader, ByteWriter};

use crate::error::{ContainerError, ContainerResult, IndexFault, KeyframeFault, LimitKind};
use crate::limits::ContainerLimits;

/// Encoded size of one frame index row (u64 offset + u32 size).
pub const INDEX_ENTRY_SIZE: usize = 12;

/// One frame index row: where the compressed chunk lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndexEntry {
    /// Absolute byte offset of the first byte of the compressed chunk.
    pub offset: u64,
    /// Compressed chunk size in bytes.
    pub size: u32,
}

/// The eagerly loaded frame index table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameIndex {
    entries: Vec<FrameIndexEntry>,
}

impl FrameIndex {
    /// Creates a frame index from already validated entries.
    #[must_use]
    pub fn from_entries(entries: Vec<FrameIndexEntry>) -> Self {
        Self { entries }
    }

    /// Returns the number of frames in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the animation has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for a frame, if it exists.
    #[must_use]
    pub fn get(&self, frame: u32) -> Option<FrameIndexEntry> {
        self.entries.get(frame as usize).copied()
    }

    /// Returns all entries in frame order.
    #[must_use]
    pub fn entries(&self) -> &[FrameIndexEntry] {
        &self.entries
    }

    /// Returns the largest chunk size in the index, or 0 when empty.
    #[must_use]
    pub fn max_chunk_size(&self) -> u32 {
        self.entries.iter().map(|e| e.size).max().unwrap_or(0)
    }

    /// Encodes the table as `total_frames` rows.
    pub fn encode(&self, writer: &mut ByteWriter) {
        for entry in &self.entries {
            writer.write_u64(entry.offset);
            writer.write_u32(entry.size);
        }
    }

    /// Decodes exactly `total_frames` rows.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::LimitExceeded`] if `total_frames` or a
    /// chunk size exceeds the limits, and wrapped byte errors on truncated
    /// input.
    pub fn decode(
        reader: &mut ByteReader<'_>,
        total_frames: u32,
        limits: &ContainerLimits,
    ) -> ContainerResult<Self> {
        if total_frames > limits.max_total_frames {
            return Err(ContainerError::LimitExceeded {
                kind: LimitKind::TotalFrames,
                limit: u64::from(limits.max_total_frames),
                actual: u64::from(total_frames),
            });
        }

        let mut entries = Vec::with_capacity(total_frames as usize);
        for _ in 0..total_frames {
            let offset = reader.read_u64()?;
            let size = reader.read_u32()?;
            if size > limits.max_chunk_bytes {
                return Err(ContainerError::LimitExceeded {
                    kind: LimitKind::ChunkBytes,
                    limit: u64::from(limits.max_chunk_bytes),
                    actual: u64::from(size),
                });
            }
            entries.push(FrameIndexEntry { offset, size });
        }
        Ok(Self { entries })
    }

    /// Validates that every chunk lies inside the data region of the file
    /// and that chunks do not overlap.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::BadIndex`] naming the first offending
    /// frame.
    pub fn validate(&self, data_start: u64, file_size: u64) -> ContainerResult<()> {
        let mut previous_end = data_start;
        for (frame, entry) in self.entries.iter().enumerate() {
            let frame = frame as u32;
            if entry.offset < data_start {
                return Err(ContainerError::BadIndex {
                    frame,
                    fault: IndexFault::BeforeDataStart {
                        offset: entry.offset,
                        data_start,
                    },
                });
            }
            if entry.offset < previous_end {
                return Err(ContainerError::BadIndex {
                    frame,
                    fault: IndexFault::Overlap {
                        offset: entry.offset,
                        previous_end,
                    },
                });
            }
            let end = entry.offset + u64::from(entry.size);
            if end > file_size {
                return Err(ContainerError::BadIndex {
                    frame,
                    fault: IndexFault::PastEndOfFile { end, file_size },
                });
            }
            previous_end = end;
        }
        Ok(())
    }
}

/// The keyframe index table: frame numbers of every I-frame, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyframeTable {
    frames: Vec<u32>,
}

impl KeyframeTable {
    /// Creates a keyframe table from already validated frame numbers.
    #[must_use]
    pub fn from_frames(frames: Vec<u32>) -> Self {
        Self { frames }
    }

    /// Returns the number of keyframes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the keyframe frame numbers in ascending order.
    #[must_use]
    pub fn frames(&self) -> &[u32] {
        &self.frames
    }

    /// Returns `true` if `frame` is a keyframe.
    #[must_use]
    pub fn contains(&self, frame: u32) -> bool {
        self.frames.binary_search(&frame).is_ok()
    }

    /// Returns the greatest keyframe at or before `frame`, by binary search.
    #[must_use]
    pub fn latest_at_or_before(&self, frame: u32) -> Option<u32> {
        match self.frames.binary_search(&frame) {
            Ok(_) => Some(frame),
            Err(0) => None,
            Err(insert) => Some(self.frames[insert - 1]),
        }
    }

    /// Encodes the table as a u32 count followed by the frame numbers.
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.frames.len() as u32);
        for &frame in &self.frames {
            writer.write_u32(frame);
        }
    }

    /// Decodes and validates the table.
    ///
    /// The table must be strictly ascending, start at frame 0, and index
    /// only existing frames. An empty table is valid only for an empty
    /// animation.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::BadKeyframeTable`] naming the violated
    /// rule, and wrapped byte errors on truncated input.
    pub fn decode(reader: &mut ByteReader<'_>, total_frames: u32) -> ContainerResult<Self> {
        let count = reader.read_u32()?;
        if count == 0 {
            if total_frames != 0 {
                return Err(ContainerError::BadKeyframeTable {
                    fault: KeyframeFault::Empty,
                });
            }
            return Ok(Self::default());
        }
        if count > total_frames {
            return Err(ContainerError::BadKeyframeTable {
                fault: KeyframeFault::TooMany {
                    count,
                    total_frames,
                },
            });
        }

        let mut frames = Vec::with_capacity(count as usize);
        for position in 0..count as usize {
            let frame = reader.read_u32()?;
            if position == 0 && frame != 0 {
                return Err(ContainerError::BadKeyframeTable {
                    fault: KeyframeFault::MissingFrameZero { first: frame },
                });
            }
            if let Some(&previous) = frames.last() {
                if frame <= previous {
                    return Err(ContainerError::BadKeyframeTable {
                        fault: KeyframeFault::NotAscending {
                            position,
                            previous,
                            current: frame,
                        },
                    });
                }
            }
            if frame >= total_frames {
                return Err(ContainerError::BadKeyframeTable {
                    fault: KeyframeFault::OutOfRange {
                        position,
                        frame,
                        total_frames,
                    },
                });
            }
            frames.push(frame);
        }
        Ok(Self { frames })
    }
}

/// Returns the byte size of the whole metadata region for the given shape,
/// which is also the offset of the first frame chunk.
#[must_use]
pub fn data_start(texture_block_bytes: usize, total_frames: u32, keyframe_count: u32) -> u64 {
    crate::header::HEADER_SIZE as u64
        + texture_block_bytes as u64
        + u64::from(total_frames) * INDEX_ENTRY_SIZE as u64
        + 4
        + u64::from(keyframe_count) * 4
}
