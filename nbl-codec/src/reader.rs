//! Random-access animation reader and playback engine.

use std::io::{Read, Seek, SeekFrom};

use log::debug;
use nbl_bytes::ByteReader;
use nbl_container::{
    decode_texture_block, ContainerError, ContainerLimits, FileHeader, FrameIndex, KeyframeFault,
    KeyframeTable, LimitKind, TextureEntry, HEADER_SIZE, INDEX_ENTRY_SIZE,
};

use crate::cancel::CancelToken;
use crate::compress::{decompress_frame, MAX_FRAME_BYTES};
use crate::error::{CodecError, CodecResult};
use crate::frame::{decode_frame, FramePayload};
use crate::live::LiveSet;

/// A random-access reader over an NBL container.
///
/// The metadata region (header, texture block, frame index, keyframe index)
/// is loaded and validated eagerly at open. Frame chunks are read on demand
/// through a reused scratch buffer sized to the largest chunk seen so far.
///
/// The reader is not thread-safe; it owns its [`LiveSet`] exclusively.
#[derive(Debug)]
pub struct Reader<R> {
    source: R,
    header: FileHeader,
    textures: Vec<TextureEntry>,
    frame_index: FrameIndex,
    keyframes: KeyframeTable,
    live: LiveSet,
    current_frame: Option<u32>,
    scratch: Vec<u8>,
}

impl<R: Read + Seek> Reader<R> {
    /// Opens an animation with the default decode limits.
    ///
    /// # Errors
    ///
    /// Any metadata validation failure is fatal; see
    /// [`open_with_limits`](Self::open_with_limits).
    pub fn open(source: R) -> CodecResult<Self> {
        Self::open_with_limits(source, &ContainerLimits::default())
    }

    /// Opens an animation, bounding every metadata allocation by `limits`.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] wrapped in [`CodecError::Container`]
    /// when the header, texture block, frame index, or keyframe table is
    /// invalid, and [`CodecError::Io`] on read failure.
    pub fn open_with_limits(mut source: R, limits: &ContainerLimits) -> CodecResult<Self> {
        let file_size = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let meta = read_metadata_region(&mut source, limits)?;

        let mut reader = ByteReader::new(&meta);
        let header = FileHeader::decode(&mut reader)?;
        let textures = decode_texture_block(&mut reader, header.texture_count, limits)?;
        let frame_index = FrameIndex::decode(&mut reader, header.total_frames, limits)?;
        let keyframes = KeyframeTable::decode(&mut reader, header.total_frames)?;

        let data_start = meta.len() as u64;
        frame_index.validate(data_start, file_size)?;

        debug!(
            "opened animation: {} frames, {} keyframes, {} textures, {} fps",
            header.total_frames,
            keyframes.len(),
            textures.len(),
            header.target_fps
        );

        Ok(Self {
            source,
            header,
            textures,
            frame_index,
            keyframes,
            live: LiveSet::new(),
            current_frame: None,
            scratch: Vec::new(),
        })
    }

    /// Returns the file header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Returns the texture block entries.
    #[must_use]
    pub fn textures(&self) -> &[TextureEntry] {
        &self.textures
    }

    /// Returns the number of frames in the animation.
    #[must_use]
    pub fn total_frames(&self) -> u32 {
        self.header.total_frames
    }

    /// Returns the keyframe table.
    #[must_use]
    pub fn keyframes(&self) -> &KeyframeTable {
        &self.keyframes
    }

    /// Returns the frame index table.
    #[must_use]
    pub fn frame_index(&self) -> &FrameIndex {
        &self.frame_index
    }

    /// Returns the frame the live set currently materializes, if any.
    #[must_use]
    pub fn current_frame(&self) -> Option<u32> {
        self.current_frame
    }

    /// Returns the current live set without touching the source.
    #[must_use]
    pub fn live(&self) -> &LiveSet {
        &self.live
    }

    /// Materializes the live set at `target`.
    ///
    /// The reader jumps to the greatest keyframe at or before `target` and
    /// walks P-frames forward. Stepping forward from the current frame
    /// within the same GOP continues in place; seeking backward restarts
    /// from the governing keyframe (P-frames are never inverted).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::FrameOutOfRange`] if `target` does not exist,
    /// and any chunk-level error attributed to the offending frame. A
    /// failed seek leaves the live set unspecified; a later seek recovers
    /// by reloading from a keyframe.
    pub fn seek(&mut self, target: u32) -> CodecResult<&LiveSet> {
        self.seek_inner(target, None)
    }

    /// Like [`seek`](Self::seek), checking `cancel` between frames.
    ///
    /// # Errors
    ///
    /// Additionally returns [`CodecError::Cancelled`] if the token fires.
    pub fn seek_cancellable(&mut self, target: u32, cancel: &CancelToken) -> CodecResult<&LiveSet> {
        self.seek_inner(target, Some(cancel))
    }

    /// Advances to the next frame, or to frame 0 before the first seek.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::FrameOutOfRange`] past the last frame.
    pub fn step_forward(&mut self) -> CodecResult<&LiveSet> {
        match self.current_frame {
            None => self.seek_inner(0, None),
            Some(current) => {
                let next = current + 1;
                if next >= self.header.total_frames {
                    return Err(CodecError::FrameOutOfRange {
                        frame: next,
                        total_frames: self.header.total_frames,
                    });
                }
                self.apply_frame(next)?;
                Ok(&self.live)
            }
        }
    }

    fn seek_inner(&mut self, target: u32, cancel: Option<&CancelToken>) -> CodecResult<&LiveSet> {
        let total = self.header.total_frames;
        if target >= total {
            return Err(CodecError::FrameOutOfRange {
                frame: target,
                total_frames: total,
            });
        }
        if self.current_frame == Some(target) {
            return Ok(&self.live);
        }

        let key = self.keyframes.latest_at_or_before(target).ok_or(
            CodecError::Container(ContainerError::BadKeyframeTable {
                fault: KeyframeFault::Empty,
            }),
        )?;

        let first = match self.current_frame {
            // Already inside the governing GOP and behind the target:
            // continue stepping from where we are.
            Some(current) if current >= key && current < target => current + 1,
            _ => {
                match self.load_frame(key)? {
                    FramePayload::Key(kf) => self.live.reset_from_key(&kf),
                    FramePayload::Delta(_) => {
                        return Err(CodecError::ExpectedKeyFrame { frame: key });
                    }
                }
                self.current_frame = Some(key);
                key + 1
            }
        };

        for frame in first..=target {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(CodecError::Cancelled);
                }
            }
            self.apply_frame(frame)?;
        }
        Ok(&self.live)
    }

    fn apply_frame(&mut self, frame: u32) -> CodecResult<()> {
        match self.load_frame(frame)? {
            FramePayload::Key(kf) => self.live.reset_from_key(&kf),
            FramePayload::Delta(df) => self.live.apply_delta(&df),
        }
        self.current_frame = Some(frame);
        Ok(())
    }

    fn load_frame(&mut self, frame: u32) -> CodecResult<FramePayload> {
        let entry = self
            .frame_index
            .get(frame)
            .ok_or(CodecError::FrameOutOfRange {
                frame,
                total_frames: self.header.total_frames,
            })?;

        self.source.seek(SeekFrom::Start(entry.offset))?;
        let size = entry.size as usize;
        self.scratch.resize(size, 0);
        self.source.read_exact(&mut self.scratch[..size])?;

        let raw = decompress_frame(&self.scratch[..size], frame, MAX_FRAME_BYTES)?;
        decode_frame(&raw, frame)
    }
}

fn read_metadata_region<R: Read>(
    source: &mut R,
    limits: &ContainerLimits,
) -> CodecResult<Vec<u8>> {
    let mut meta = vec![0u8; HEADER_SIZE];
    source.read_exact(&mut meta)?;

    // First pass over the fixed header just discovers the region shape; the
    // validating parse runs afterwards over the complete buffer.
    let header = FileHeader::decode(&mut ByteReader::new(&meta))?;

    for _ in 0..header.texture_count {
        let len_at = meta.len();
        read_more(source, &mut meta, 2)?;
        let path_len = u16::from_le_bytes([meta[len_at], meta[len_at + 1]]) as usize;
        read_more(source, &mut meta, path_len + 2)?;

        let block_bytes = (meta.len() - HEADER_SIZE) as u64;
        if block_bytes > limits.max_texture_block_bytes {
            return Err(CodecError::Container(ContainerError::LimitExceeded {
                kind: LimitKind::TextureBlockBytes,
                limit: limits.max_texture_block_bytes,
                actual: block_bytes,
            }));
        }
    }

    if header.total_frames > limits.max_total_frames {
        return Err(CodecError::Container(ContainerError::LimitExceeded {
            kind: LimitKind::TotalFrames,
            limit: u64::from(limits.max_total_frames),
            actual: u64::from(header.total_frames),
        }));
    }
    read_more(source, &mut meta, header.total_frames as usize * INDEX_ENTRY_SIZE)?;

    let count_at = meta.len();
    read_more(source, &mut meta, 4)?;
    let keyframe_count = u32::from_le_bytes([
        meta[count_at],
        meta[count_at + 1],
        meta[count_at + 2],
        meta[count_at + 3],
    ]);
    if keyframe_count > header.total_frames {
        return Err(CodecError::Container(ContainerError::BadKeyframeTable {
            fault: KeyframeFault::TooMany {
                count: keyframe_count,
                total_frames: header.total_frames,
            },
        }));
    }
    read_more(source, &mut meta, keyframe_count as usize * 4)?;

    Ok(meta)
}

fn read_more<R: Read>(source: &mut R, meta: &mut Vec<u8>, count: usize) -> CodecResult<()> {
    let start = meta.len();
    meta.resize(start + count, 0);
    source.read_exact(&mut meta[start..])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use nbl_bytes::ByteWriter;
    use nbl_container::{encode_texture_block, texture_block_len, REQUIRED_ATTRIBUTES};

    use crate::compress::{compress_frame, DEFAULT_LEVEL};
    use crate::frame::KeyFrame;
    use crate::types::ParticleId;

    /// Hand-assembles a minimal one-frame container around `payload`.
    fn single_chunk_file(payload: &FramePayload) -> Vec<u8> {
        let chunk = compress_frame(&payload.encode(), DEFAULT_LEVEL).unwrap();
        let textures = vec![TextureEntry {
            path: "minecraft:textures/particle/flame.png".to_owned(),
            rows: 1,
            cols: 1,
        }];
        let data_start = nbl_container::data_start(texture_block_len(&textures), 1, 1);

        let header = FileHeader {
            target_fps: 30,
            total_frames: 1,
            texture_count: 1,
            attributes: REQUIRED_ATTRIBUTES,
            bbox_min: [0.0; 3],
            bbox_max: [4.0; 3],
        };
        let mut writer = ByteWriter::new();
        header.encode(&mut writer);
        encode_texture_block(&textures, &mut writer).unwrap();
        writer.write_u64(data_start);
        writer.write_u32(chunk.len() as u32);
        writer.write_u32(1);
        writer.write_u32(0);
        let mut file = writer.finish();
        assert_eq!(file.len() as u64, data_start);
        file.extend_from_slice(&chunk);
        file
    }

    fn one_particle_payload() -> FramePayload {
        FramePayload::Key(KeyFrame {
            ids: vec![ParticleId::new(42)],
            px: vec![1.0],
            py: vec![2.0],
            pz: vec![3.0],
            cr: vec![255],
            cg: vec![128],
            cb: vec![64],
            ca: vec![255],
            sizes: vec![100],
            tex_ids: vec![0],
            seq_idxs: vec![0],
        })
    }

    #[test]
    fn open_and_seek_single_frame() {
        let file = single_chunk_file(&one_particle_payload());
        let mut reader = Reader::open(Cursor::new(file)).unwrap();

        assert_eq!(reader.total_frames(), 1);
        assert_eq!(reader.textures().len(), 1);
        assert_eq!(reader.current_frame(), None);

        let live = reader.seek(0).unwrap();
        assert_eq!(live.len(), 1);
        let state = live.get(ParticleId::new(42)).unwrap();
        assert_eq!(state.pos, [1.0, 2.0, 3.0]);
        assert_eq!(state.color, [255, 128, 64, 255]);
        assert_eq!(state.size, 100);
        assert_eq!(state.tex_id, 0);
        assert_eq!(state.seq_idx, 0);
        assert_eq!(reader.current_frame(), Some(0));
    }

    #[test]
    fn seek_past_end_is_out_of_range() {
        let file = single_chunk_file(&one_particle_payload());
        let mut reader = Reader::open(Cursor::new(file)).unwrap();
        let err = reader.seek(1).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FrameOutOfRange {
                frame: 1,
                total_frames: 1
            }
        ));
    }

    #[test]
    fn step_forward_before_any_seek_lands_on_frame_zero() {
        let file = single_chunk_file(&one_particle_payload());
        let mut reader = Reader::open(Cursor::new(file)).unwrap();
        let live = reader.step_forward().unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(reader.current_frame(), Some(0));

        let err = reader.step_forward().unwrap_err();
        assert!(matches!(err, CodecError::FrameOutOfRange { .. }));
    }

    #[test]
    fn keyframe_chunk_must_be_key_typed() {
        let delta = FramePayload::Delta(crate::frame::DeltaFrame::default());
        let file = single_chunk_file(&delta);
        let mut reader = Reader::open(Cursor::new(file)).unwrap();
        let err = reader.seek(0).unwrap_err();
        assert!(matches!(err, CodecError::ExpectedKeyFrame { frame: 0 }));
    }

    #[test]
    fn corrupt_chunk_is_bad_compression() {
        let mut file = single_chunk_file(&one_particle_payload());
        let len = file.len();
        file[len - 10] ^= 0xFF;
        // Clobber the magic so the chunk is unmistakably invalid.
        let data_start = len - compress_frame(&one_particle_payload().encode(), DEFAULT_LEVEL)
            .unwrap()
            .len();
        file[data_start] = 0;

        let mut reader = Reader::open(Cursor::new(file)).unwrap();
        let err = reader.seek(0).unwrap_err();
        assert!(matches!(err, CodecError::BadCompression { frame: 0 }));
    }

    #[test]
    fn open_rejects_index_escaping_file() {
        let mut file = single_chunk_file(&one_particle_payload());
        // Grow the recorded chunk size beyond the end of the file. The size
        // field sits right after the u64 offset in the single index row.
        let textures_len = texture_block_len(&[TextureEntry {
            path: "minecraft:textures/particle/flame.png".to_owned(),
            rows: 1,
            cols: 1,
        }]);
        let size_at = HEADER_SIZE + textures_len + 8;
        file[size_at..size_at + 4].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = Reader::open(Cursor::new(file)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Container(ContainerError::LimitExceeded { .. })
                | CodecError::Container(ContainerError::BadIndex { .. })
        ));
    }

    #[test]
    fn empty_animation_opens_but_never_seeks() {
        let header = FileHeader {
            target_fps: 30,
            total_frames: 0,
            texture_count: 0,
            attributes: REQUIRED_ATTRIBUTES,
            bbox_min: [0.0; 3],
            bbox_max: [0.0; 3],
        };
        let mut writer = ByteWriter::new();
        header.encode(&mut writer);
        writer.write_u32(0);
        let file = writer.finish();

        let mut reader = Reader::open(Cursor::new(file)).unwrap();
        assert_eq!(reader.total_frames(), 0);
        let err = reader.seek(0).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FrameOutOfRange {
                frame: 0,
                total_frames: 0
            }
        ));
    }

    #[test]
    fn open_rejects_truncated_metadata() {
        let file = single_chunk_file(&one_particle_payload());
        let err = Reader::open(Cursor::new(file[..40].to_vec())).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
