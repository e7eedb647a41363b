//! Streaming transcoder: read, edit, re-encode.

use std::io::{Read, Seek, Write};

use log::debug;

use crate::cancel::CancelToken;
use crate::error::{CodecError, CodecResult};
use crate::frame::SIZE_SCALE;
use crate::live::LiveSet;
use crate::reader::Reader;
use crate::types::{ParticleId, ParticleState};
use crate::writer::Writer;

/// A state-preserving per-particle edit.
///
/// Ops are applied in order, before the caller's transform closure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditOp {
    /// Multiplies the sprite size by a factor.
    ScaleSize(f32),
    /// Sets every sprite size to the given value in block units.
    UniformSize(f32),
    /// Multiplies RGB by `gain` and alpha by `alpha_gain`, saturating.
    AdjustColor { gain: f32, alpha_gain: f32 },
    /// Scales positions about the origin, then translates.
    Transform { translate: [f32; 3], scale: f32 },
}

impl EditOp {
    fn apply(self, state: &mut ParticleState) {
        match self {
            Self::ScaleSize(factor) => {
                state.size = scale_u16(state.size, factor);
            }
            Self::UniformSize(size) => {
                state.size = (size * SIZE_SCALE).round_ties_even().clamp(0.0, 65535.0) as u16;
            }
            Self::AdjustColor { gain, alpha_gain } => {
                state.color[0] = scale_u8(state.color[0], gain);
                state.color[1] = scale_u8(state.color[1], gain);
                state.color[2] = scale_u8(state.color[2], gain);
                state.color[3] = scale_u8(state.color[3], alpha_gain);
            }
            Self::Transform { translate, scale } => {
                for axis in 0..3 {
                    state.pos[axis] = state.pos[axis] * scale + translate[axis];
                }
            }
        }
    }
}

fn scale_u16(value: u16, factor: f32) -> u16 {
    (f32::from(value) * factor).round_ties_even().clamp(0.0, 65535.0) as u16
}

fn scale_u8(value: u8, factor: f32) -> u8 {
    (f32::from(value) * factor).round_ties_even().clamp(0.0, 255.0) as u8
}

/// Retiming and editing options for a transcode run.
#[derive(Debug, Clone, Default)]
pub struct TranscodeOptions {
    /// Inclusive source frame range to keep; out-of-range bounds are
    /// clamped to the animation. `None` keeps every frame.
    pub trim: Option<(u32, u32)>,
    /// Keep every `stride`-th source frame. 0 and 1 both keep every frame;
    /// larger strides drop frames, and the writer re-keyframes the output.
    pub stride: u32,
    /// Per-particle edits applied to every kept frame.
    pub ops: Vec<EditOp>,
}

/// Streams `reader` through `writer`, applying the edit pipeline and an
/// arbitrary per-particle transform.
///
/// Every kept source frame is materialized by the playback engine, edited,
/// and pushed; the writer re-decides keyframe placement, so trimming and
/// striding preserve the P-frame invariants. Returns the writer's sink.
///
/// # Errors
///
/// Returns [`CodecError::Cancelled`] if the token fires between frames,
/// and any reader or writer error. On error the partial output must be
/// discarded.
pub fn transcode<R, W, F>(
    reader: &mut Reader<R>,
    mut writer: Writer<W>,
    options: &TranscodeOptions,
    mut transform: F,
    cancel: &CancelToken,
) -> CodecResult<W>
where
    R: Read + Seek,
    W: Write,
    F: FnMut(ParticleId, ParticleState) -> ParticleState,
{
    let total = reader.total_frames();
    let range = match options.trim {
        _ if total == 0 => None,
        Some((start, end)) => {
            let start = start.min(total - 1);
            let end = end.min(total - 1).max(start);
            Some((start, end))
        }
        None => Some((0, total - 1)),
    };

    let stride = options.stride.max(1);
    let mut kept = 0u32;
    if let Some((start, end)) = range {
        let mut src = start;
        loop {
            if cancel.is_cancelled() {
                return Err(CodecError::Cancelled);
            }

            let live = reader.seek_cancellable(src, cancel)?;
            let mut edited = LiveSet::with_capacity(live.len());
            for (id, mut state) in live.iter() {
                for op in &options.ops {
                    op.apply(&mut state);
                }
                let state = transform(id, state);
                edited.insert(id, state);
            }
            writer.push_frame(&edited, false)?;
            kept += 1;

            src = match src.checked_add(stride) {
                Some(next) if next <= end => next,
                _ => break,
            };
        }
    }

    let sink = writer.finish()?;
    debug!("transcoded {kept} of {total} source frames");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ParticleState {
        ParticleState {
            pos: [1.0, -2.0, 0.5],
            color: [100, 200, 40, 128],
            size: 100,
            tex_id: 0,
            seq_idx: 0,
        }
    }

    #[test]
    fn scale_size_op() {
        let mut s = state();
        EditOp::ScaleSize(2.5).apply(&mut s);
        assert_eq!(s.size, 250);
    }

    #[test]
    fn scale_size_saturates() {
        let mut s = state();
        s.size = 40_000;
        EditOp::ScaleSize(2.0).apply(&mut s);
        assert_eq!(s.size, 65_535);
    }

    #[test]
    fn uniform_size_op_takes_block_units() {
        let mut s = state();
        EditOp::UniformSize(1.5).apply(&mut s);
        assert_eq!(s.size, 150);
        assert_eq!(s.real_size(), 1.5);
    }

    #[test]
    fn adjust_color_op() {
        let mut s = state();
        EditOp::AdjustColor {
            gain: 1.5,
            alpha_gain: 0.5,
        }
        .apply(&mut s);
        assert_eq!(s.color, [150, 255, 60, 64]);
    }

    #[test]
    fn transform_op_scales_then_translates() {
        let mut s = state();
        EditOp::Transform {
            translate: [10.0, 0.0, -1.0],
            scale: 2.0,
        }
        .apply(&mut s);
        assert_eq!(s.pos, [12.0, -4.0, 0.0]);
    }
}
