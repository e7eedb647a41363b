//! Streaming animation encoder.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

use log::{debug, trace};
use nbl_bytes::ByteWriter;
use nbl_container::{
    data_start, encode_texture_block, texture_block_len, ContainerError, FileHeader, FrameIndex,
    FrameIndexEntry, KeyframeTable, LimitKind, TextureEntry, REQUIRED_ATTRIBUTES,
};

use crate::compress::{compress_frame, DEFAULT_LEVEL};
use crate::error::{CodecError, CodecResult};
use crate::frame::{DeltaFrame, FramePayload, POS_SCALE};
use crate::live::LiveSet;
use crate::types::{Axis, ParticleId, ParticleState};

/// Encoder policy knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    /// Intended playback rate written to the header.
    pub target_fps: u16,
    /// Maximum GOP length: an I-frame is forced every `max_gop` frames.
    /// Values below 1 behave as 1.
    pub max_gop: u32,
    /// Zstd compression level for frame chunks.
    pub zstd_level: i32,
    /// Force an I-frame when a quantized position delta would not fit in
    /// 16 bits. When disabled the overflowing frame fails with
    /// [`CodecError::DeltaOverflow`] instead.
    pub key_on_overflow: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            target_fps: 30,
            max_gop: 60,
            zstd_level: DEFAULT_LEVEL,
            key_on_overflow: true,
        }
    }
}

/// A streaming encoder producing a complete NBL container.
///
/// Frames are pushed in order as materialized live sets. Compressed chunks
/// are spooled to an anonymous temp file so the frame and keyframe counts
/// need not be known up front; [`finish`](Self::finish) assembles the
/// metadata region and streams the spool into the sink.
///
/// A failed push poisons the writer: the partial output is invalid and
/// every later call fails with [`CodecError::WriterClosed`].
#[derive(Debug)]
pub struct Writer<W: Write> {
    sink: W,
    options: EncoderOptions,
    textures: Vec<TextureEntry>,
    spool: File,
    chunk_sizes: Vec<u32>,
    keyframes: Vec<u32>,
    prev: HashMap<ParticleId, ParticleState>,
    frames_in_gop: u32,
    bbox: Option<([f32; 3], [f32; 3])>,
    poisoned: bool,
}

impl<W: Write> Writer<W> {
    /// Creates a writer over `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TooManyTextures`] when the texture count does
    /// not fit the header field, a wrapped [`ContainerError`] for an
    /// invalid texture entry, and [`CodecError::Io`] if the spool cannot
    /// be created.
    pub fn create(
        sink: W,
        options: EncoderOptions,
        textures: Vec<TextureEntry>,
    ) -> CodecResult<Self> {
        if u16::try_from(textures.len()).is_err() {
            return Err(CodecError::TooManyTextures {
                count: textures.len(),
            });
        }
        for (index, texture) in textures.iter().enumerate() {
            if texture.rows == 0 || texture.cols == 0 {
                return Err(CodecError::Container(ContainerError::MalformedTexture {
                    index,
                }));
            }
            if texture.path.len() > usize::from(u16::MAX) {
                return Err(CodecError::Bytes(nbl_bytes::ByteError::StringTooLong {
                    length: texture.path.len(),
                }));
            }
        }

        let spool = tempfile::tempfile()?;
        Ok(Self {
            sink,
            options,
            textures,
            spool,
            chunk_sizes: Vec::new(),
            keyframes: Vec::new(),
            prev: HashMap::new(),
            frames_in_gop: 0,
            bbox: None,
            poisoned: false,
        })
    }

    /// Returns the number of frames pushed so far.
    #[must_use]
    pub fn frames_written(&self) -> u32 {
        self.chunk_sizes.len() as u32
    }

    /// Encodes and spools one frame.
    ///
    /// The encoder chooses the frame type: frame 0, a `force_key` hint, a
    /// full GOP, or an overflowing position delta all produce an I-frame;
    /// everything else becomes a quantized P-frame against the previous
    /// pushed frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DeltaOverflow`] when `key_on_overflow` is
    /// disabled and a particle moved too far, and [`CodecError::Io`] on
    /// spool failure. Any error poisons the writer.
    pub fn push_frame(&mut self, live: &LiveSet, force_key: bool) -> CodecResult<()> {
        if self.poisoned {
            return Err(CodecError::WriterClosed);
        }
        match self.push_frame_inner(live, force_key) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    fn push_frame_inner(&mut self, live: &LiveSet, force_key: bool) -> CodecResult<()> {
        let frame = self.frames_written();

        let mut payload = None;
        if frame != 0 && !force_key && self.frames_in_gop < self.options.max_gop.max(1) {
            match build_delta(&self.prev, live) {
                DeltaBuild::Frame(df) => payload = Some(FramePayload::Delta(df)),
                DeltaBuild::Overflow { id, axis, delta_q } => {
                    if !self.options.key_on_overflow {
                        return Err(CodecError::DeltaOverflow {
                            frame,
                            id,
                            axis,
                            delta_q,
                        });
                    }
                    trace!("frame {frame}: particle {id} teleported on {axis}, forcing keyframe");
                }
            }
        }
        let payload = payload.unwrap_or_else(|| FramePayload::Key(live.to_key_frame()));
        let is_key = matches!(payload, FramePayload::Key(_));

        let compressed = compress_frame(&payload.encode(), self.options.zstd_level)?;
        let size = u32::try_from(compressed.len()).map_err(|_| {
            CodecError::Container(ContainerError::LimitExceeded {
                kind: LimitKind::ChunkBytes,
                limit: u64::from(u32::MAX),
                actual: compressed.len() as u64,
            })
        })?;
        self.spool.write_all(&compressed)?;
        self.chunk_sizes.push(size);

        if is_key {
            self.keyframes.push(frame);
            self.frames_in_gop = 1;
        } else {
            self.frames_in_gop += 1;
        }

        self.prev.clear();
        for (id, state) in live.iter() {
            self.grow_bbox(state.pos);
            self.prev.insert(id, state);
        }
        Ok(())
    }

    fn grow_bbox(&mut self, pos: [f32; 3]) {
        match &mut self.bbox {
            Some((min, max)) => {
                for axis in 0..3 {
                    min[axis] = min[axis].min(pos[axis]);
                    max[axis] = max[axis].max(pos[axis]);
                }
            }
            None => self.bbox = Some((pos, pos)),
        }
    }

    /// Assembles the final container and returns the sink.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::WriterClosed`] on a poisoned writer and
    /// [`CodecError::Io`] if writing the sink fails.
    pub fn finish(mut self) -> CodecResult<W> {
        if self.poisoned {
            return Err(CodecError::WriterClosed);
        }

        let total_frames = self.frames_written();
        let (bbox_min, bbox_max) = self.bbox.unwrap_or(([0.0; 3], [0.0; 3]));
        let header = FileHeader {
            target_fps: self.options.target_fps,
            total_frames,
            texture_count: self.textures.len() as u16,
            attributes: REQUIRED_ATTRIBUTES,
            bbox_min,
            bbox_max,
        };

        let start = data_start(
            texture_block_len(&self.textures),
            total_frames,
            self.keyframes.len() as u32,
        );
        let mut offset = start;
        let mut entries = Vec::with_capacity(self.chunk_sizes.len());
        for &size in &self.chunk_sizes {
            entries.push(FrameIndexEntry { offset, size });
            offset += u64::from(size);
        }

        let mut meta = ByteWriter::with_capacity(start as usize);
        header.encode(&mut meta);
        encode_texture_block(&self.textures, &mut meta)?;
        FrameIndex::from_entries(entries).encode(&mut meta);
        KeyframeTable::from_frames(self.keyframes.clone()).encode(&mut meta);
        let meta = meta.finish();
        debug_assert_eq!(meta.len() as u64, start);

        self.sink.write_all(&meta)?;
        self.spool.seek(SeekFrom::Start(0))?;
        io::copy(&mut self.spool, &mut self.sink)?;
        self.sink.flush()?;

        debug!(
            "finished animation: {} frames, {} keyframes, {} bytes of chunks",
            total_frames,
            self.keyframes.len(),
            offset - start
        );
        Ok(self.sink)
    }
}

enum DeltaBuild {
    Frame(DeltaFrame),
    Overflow {
        id: ParticleId,
        axis: Axis,
        delta_q: i64,
    },
}

/// Quantizes the difference between the previous frame and `live`.
///
/// Particles absent from `prev` are delta-coded from the zero basis: the
/// position and size deltas are the quantized absolute values and the
/// byte-wide columns carry the absolute values reinterpreted as signed.
fn build_delta(prev: &HashMap<ParticleId, ParticleState>, live: &LiveSet) -> DeltaBuild {
    let mut df = DeltaFrame::with_capacity(live.len());
    for (id, cur) in live.iter() {
        let base = prev.get(&id);
        let zero = ParticleState::default();
        let from = base.unwrap_or(&zero);

        let dx = match quantize_pos(cur.pos[0] - from.pos[0]) {
            Ok(q) => q,
            Err(delta_q) => return DeltaBuild::Overflow { id, axis: Axis::X, delta_q },
        };
        let dy = match quantize_pos(cur.pos[1] - from.pos[1]) {
            Ok(q) => q,
            Err(delta_q) => return DeltaBuild::Overflow { id, axis: Axis::Y, delta_q },
        };
        let dz = match quantize_pos(cur.pos[2] - from.pos[2]) {
            Ok(q) => q,
            Err(delta_q) => return DeltaBuild::Overflow { id, axis: Axis::Z, delta_q },
        };

        let (dr, dg, db, da, dtex, dseq) = match base {
            Some(prev_state) => (
                byte_delta(cur.color[0], prev_state.color[0]),
                byte_delta(cur.color[1], prev_state.color[1]),
                byte_delta(cur.color[2], prev_state.color[2]),
                byte_delta(cur.color[3], prev_state.color[3]),
                byte_delta(cur.tex_id, prev_state.tex_id),
                byte_delta(cur.seq_idx, prev_state.seq_idx),
            ),
            // Zero basis: store the absolute bytes verbatim.
            None => (
                cur.color[0] as i8,
                cur.color[1] as i8,
                cur.color[2] as i8,
                cur.color[3] as i8,
                cur.tex_id as i8,
                cur.seq_idx as i8,
            ),
        };

        let dsize = (i32::from(cur.size) - i32::from(from.size))
            .clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;

        df.ids.push(id);
        df.dx.push(dx);
        df.dy.push(dy);
        df.dz.push(dz);
        df.dr.push(dr);
        df.dg.push(dg);
        df.db.push(db);
        df.da.push(da);
        df.dsize.push(dsize);
        df.dtex.push(dtex);
        df.dseq.push(dseq);
    }
    DeltaBuild::Frame(df)
}

/// Quantizes a real position delta to thousandths, round-half-to-even.
///
/// Magnitudes above 32767 stored units do not fit the wire format; the
/// overflowing value is reported so the caller can force a keyframe.
fn quantize_pos(delta: f32) -> Result<i16, i64> {
    let q = (delta * POS_SCALE).round_ties_even();
    if (-32767.0..=32767.0).contains(&q) {
        Ok(q as i16)
    } else {
        Err(q as i64)
    }
}

fn byte_delta(cur: u8, prev: u8) -> i8 {
    (i16::from(cur) - i16::from(prev)).clamp(-128, 127) as i8
}
