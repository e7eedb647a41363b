//! I-frame and P-frame payload codec.
//!
//! Frame payloads are strict struct-of-arrays: each attribute is one
//! contiguous column across all particles, and every column shares the same
//! row order, so the i-th entry of every array describes the same particle.
//! The raw chunk is the 5-byte frame header (type byte plus u32 particle
//! count) followed immediately by the columns, with no padding.

use std::collections::HashSet;

use nbl_bytes::{ByteReader, ByteWriter};

use crate::error::{CodecError, CodecResult};
use crate::types::ParticleId;

/// Frame type byte for an I-frame carrying absolute state.
pub const FRAME_TYPE_KEY: u8 = 0;

/// Frame type byte for a P-frame carrying quantized deltas.
pub const FRAME_TYPE_DELTA: u8 = 1;

/// Size of the frame header preceding the payload.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Payload bytes per particle in an I-frame.
pub const KEY_ROW_BYTES: u64 = 12 + 4 + 2 + 1 + 1 + 4;

/// Payload bytes per particle in a P-frame.
pub const DELTA_ROW_BYTES: u64 = 6 + 4 + 2 + 1 + 1 + 4;

/// Position deltas are stored in thousandths of a block.
pub const POS_SCALE: f32 = 1000.0;

/// Size deltas are stored in hundredths of a block.
pub const SIZE_SCALE: f32 = 100.0;

/// Decoded I-frame payload: absolute state for every live particle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyFrame {
    pub ids: Vec<ParticleId>,
    pub px: Vec<f32>,
    pub py: Vec<f32>,
    pub pz: Vec<f32>,
    pub cr: Vec<u8>,
    pub cg: Vec<u8>,
    pub cb: Vec<u8>,
    pub ca: Vec<u8>,
    pub sizes: Vec<u16>,
    pub tex_ids: Vec<u8>,
    pub seq_idxs: Vec<u8>,
}

impl KeyFrame {
    /// Returns the number of particles in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the frame carries no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Decoded P-frame payload: quantized deltas plus the lifecycle ID column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeltaFrame {
    pub ids: Vec<ParticleId>,
    pub dx: Vec<i16>,
    pub dy: Vec<i16>,
    pub dz: Vec<i16>,
    pub dr: Vec<i8>,
    pub dg: Vec<i8>,
    pub db: Vec<i8>,
    pub da: Vec<i8>,
    pub dsize: Vec<i16>,
    pub dtex: Vec<i8>,
    pub dseq: Vec<i8>,
}

impl DeltaFrame {
    /// Returns the number of particles in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the frame carries no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Creates an empty delta frame with room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            dx: Vec::with_capacity(capacity),
            dy: Vec::with_capacity(capacity),
            dz: Vec::with_capacity(capacity),
            dr: Vec::with_capacity(capacity),
            dg: Vec::with_capacity(capacity),
            db: Vec::with_capacity(capacity),
            da: Vec::with_capacity(capacity),
            dsize: Vec::with_capacity(capacity),
            dtex: Vec::with_capacity(capacity),
            dseq: Vec::with_capacity(capacity),
        }
    }
}

/// A decoded frame payload of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    Key(KeyFrame),
    Delta(DeltaFrame),
}

impl FramePayload {
    /// Returns the on-disk frame type byte.
    #[must_use]
    pub fn frame_type(&self) -> u8 {
        match self {
            Self::Key(_) => FRAME_TYPE_KEY,
            Self::Delta(_) => FRAME_TYPE_DELTA,
        }
    }

    /// Returns the number of particles in the frame.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        match self {
            Self::Key(kf) => kf.len(),
            Self::Delta(df) => df.len(),
        }
    }

    /// Encodes the frame header and SoA payload into raw chunk bytes,
    /// ready for compression.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Key(kf) => encode_key(kf),
            Self::Delta(df) => encode_delta(df),
        }
    }
}

fn encode_key(kf: &KeyFrame) -> Vec<u8> {
    let n = kf.len();
    let mut writer = ByteWriter::with_capacity(FRAME_HEADER_SIZE + n * KEY_ROW_BYTES as usize);
    writer.write_u8(FRAME_TYPE_KEY);
    writer.write_u32(n as u32);

    for &v in &kf.px {
        writer.write_f32(v);
    }
    for &v in &kf.py {
        writer.write_f32(v);
    }
    for &v in &kf.pz {
        writer.write_f32(v);
    }
    for &v in &kf.cr {
        writer.write_u8(v);
    }
    for &v in &kf.cg {
        writer.write_u8(v);
    }
    for &v in &kf.cb {
        writer.write_u8(v);
    }
    for &v in &kf.ca {
        writer.write_u8(v);
    }
    for &v in &kf.sizes {
        writer.write_u16(v);
    }
    for &v in &kf.tex_ids {
        writer.write_u8(v);
    }
    for &v in &kf.seq_idxs {
        writer.write_u8(v);
    }
    for &id in &kf.ids {
        writer.write_i32(id.raw());
    }
    writer.finish()
}

fn encode_delta(df: &DeltaFrame) -> Vec<u8> {
    let n = df.len();
    let mut writer = ByteWriter::with_capacity(FRAME_HEADER_SIZE + n * DELTA_ROW_BYTES as usize);
    writer.write_u8(FRAME_TYPE_DELTA);
    writer.write_u32(n as u32);

    for &v in &df.dx {
        writer.write_i16(v);
    }
    for &v in &df.dy {
        writer.write_i16(v);
    }
    for &v in &df.dz {
        writer.write_i16(v);
    }
    for &v in &df.dr {
        writer.write_i8(v);
    }
    for &v in &df.dg {
        writer.write_i8(v);
    }
    for &v in &df.db {
        writer.write_i8(v);
    }
    for &v in &df.da {
        writer.write_i8(v);
    }
    for &v in &df.dsize {
        writer.write_i16(v);
    }
    for &v in &df.dtex {
        writer.write_i8(v);
    }
    for &v in &df.dseq {
        writer.write_i8(v);
    }
    for &id in &df.ids {
        writer.write_i32(id.raw());
    }
    writer.finish()
}

/// Decodes raw (decompressed) chunk bytes into a frame payload.
///
/// `frame` is only used to attribute errors.
///
/// # Errors
///
/// Returns [`CodecError::UnknownFrameType`] for an invalid type byte,
/// [`CodecError::PayloadSizeMismatch`] when the payload length does not
/// equal the row size times the particle count, and
/// [`CodecError::DuplicateParticleId`] when the ID column repeats a value.
pub fn decode_frame(raw: &[u8], frame: u32) -> CodecResult<FramePayload> {
    let mut reader = ByteReader::new(raw);
    let frame_type = reader.read_u8()?;
    let count = reader.read_u32()?;
    let actual = reader.remaining() as u64;

    match frame_type {
        FRAME_TYPE_KEY => {
            let expected = u64::from(count) * KEY_ROW_BYTES;
            if actual != expected {
                return Err(CodecError::PayloadSizeMismatch {
                    frame,
                    expected,
                    actual,
                });
            }
            let kf = decode_key_payload(&mut reader, count as usize)?;
            check_unique_ids(&kf.ids, frame)?;
            Ok(FramePayload::Key(kf))
        }
        FRAME_TYPE_DELTA => {
            let expected = u64::from(count) * DELTA_ROW_BYTES;
            if actual != expected {
                return Err(CodecError::PayloadSizeMismatch {
                    frame,
                    expected,
                    actual,
                });
            }
            let df = decode_delta_payload(&mut reader, count as usize)?;
            check_unique_ids(&df.ids, frame)?;
            Ok(FramePayload::Delta(df))
        }
        found => Err(CodecError::UnknownFrameType { frame, found }),
    }
}

fn decode_key_payload(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<KeyFrame> {
    let px = read_f32s(reader, count)?;
    let py = read_f32s(reader, count)?;
    let pz = read_f32s(reader, count)?;
    let cr = read_u8s(reader, count)?;
    let cg = read_u8s(reader, count)?;
    let cb = read_u8s(reader, count)?;
    let ca = read_u8s(reader, count)?;
    let sizes = read_u16s(reader, count)?;
    let tex_ids = read_u8s(reader, count)?;
    let seq_idxs = read_u8s(reader, count)?;
    let ids = read_ids(reader, count)?;
    Ok(KeyFrame {
        ids,
        px,
        py,
        pz,
        cr,
        cg,
        cb,
        ca,
        sizes,
        tex_ids,
        seq_idxs,
    })
}

fn decode_delta_payload(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<DeltaFrame> {
    let dx = read_i16s(reader, count)?;
    let dy = read_i16s(reader, count)?;
    let dz = read_i16s(reader, count)?;
    let dr = read_i8s(reader, count)?;
    let dg = read_i8s(reader, count)?;
    let db = read_i8s(reader, count)?;
    let da = read_i8s(reader, count)?;
    let dsize = read_i16s(reader, count)?;
    let dtex = read_i8s(reader, count)?;
    let dseq = read_i8s(reader, count)?;
    let ids = read_ids(reader, count)?;
    Ok(DeltaFrame {
        ids,
        dx,
        dy,
        dz,
        dr,
        dg,
        db,
        da,
        dsize,
        dtex,
        dseq,
    })
}

fn read_f32s(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<Vec<f32>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(reader.read_f32()?);
    }
    Ok(out)
}

fn read_u8s(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<Vec<u8>> {
    Ok(reader.read_bytes(count)?.to_vec())
}

fn read_i8s(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<Vec<i8>> {
    Ok(reader.read_bytes(count)?.iter().map(|&b| b as i8).collect())
}

fn read_u16s(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<Vec<u16>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(reader.read_u16()?);
    }
    Ok(out)
}

fn read_i16s(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<Vec<i16>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(reader.read_i16()?);
    }
    Ok(out)
}

fn read_ids(reader: &mut ByteReader<'_>, count: usize) -> CodecResult<Vec<ParticleId>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(ParticleId::new(reader.read_i32()?));
    }
    Ok(out)
}

fn check_unique_ids(ids: &[ParticleId], frame: u32) -> CodecResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(CodecError::DuplicateParticleId { frame, id });
        }
    }
    Ok(())
}
