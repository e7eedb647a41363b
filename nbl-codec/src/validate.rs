//! Optional whole-animation validator.
//!
//! The codec accepts files whose particles reference missing textures or
//! escape the declared bounding box; this walk reports them without
//! failing.

use std::fmt;
use std::io::{Read, Seek};

use crate::cancel::CancelToken;
use crate::error::{CodecError, CodecResult};
use crate::reader::Reader;
use crate::types::ParticleId;

/// A non-fatal consistency finding.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// A particle references a texture past the texture block.
    TextureIdOutOfRange {
        frame: u32,
        id: ParticleId,
        tex_id: u8,
        texture_count: u16,
    },
    /// A particle position escapes the header bounding box.
    PositionOutsideBBox {
        frame: u32,
        id: ParticleId,
        position: [f32; 3],
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextureIdOutOfRange {
                frame,
                id,
                tex_id,
                texture_count,
            } => {
                write!(
                    f,
                    "frame {frame}: particle {id} references texture {tex_id} of {texture_count}"
                )
            }
            Self::PositionOutsideBBox {
                frame,
                id,
                position,
            } => {
                write!(
                    f,
                    "frame {frame}: particle {id} at {position:?} escapes the bounding box"
                )
            }
        }
    }
}

/// Walks every frame and reports consistency issues.
///
/// # Errors
///
/// Returns [`CodecError::Cancelled`] if the token fires between frames,
/// and any playback error.
pub fn validate_animation<R: Read + Seek>(
    reader: &mut Reader<R>,
    cancel: &CancelToken,
) -> CodecResult<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let header = *reader.header();

    for frame in 0..header.total_frames {
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }
        let live = reader.seek(frame)?;
        for (id, state) in live.iter() {
            if u16::from(state.tex_id) >= header.texture_count {
                issues.push(ValidationIssue::TextureIdOutOfRange {
                    frame,
                    id,
                    tex_id: state.tex_id,
                    texture_count: header.texture_count,
                });
            }
            let inside = (0..3).all(|axis| {
                state.pos[axis] >= header.bbox_min[axis]
                    && state.pos[axis] <= header.bbox_max[axis]
            });
            if !inside {
                issues.push(ValidationIssue::PositionOutsideBBox {
                    frame,
                    id,
                    position: state.pos,
                });
            }
        }
    }
    Ok(issues)
}
