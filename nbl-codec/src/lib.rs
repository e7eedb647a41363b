//! Codec for NBL (NebulaFX) particle animation containers.
//!
//! This is the main codec crate. It ties together the byte cursor and
//! container metadata layers to provide:
//!
//! - a random-access [`Reader`] that materializes the live particle set at
//!   any frame by seeking to the nearest preceding I-frame and walking
//!   P-frames forward,
//! - a streaming [`Writer`] that consumes absolute per-frame states,
//!   decides I/P-frame placement, quantizes deltas, and assembles the
//!   final container, and
//! - a [`transcode`] driver for state-preserving edits.
//!
//! # Design Principles
//!
//! - **Correctness first** - Every format invariant is validated on read.
//! - **No dynamic dispatch in the hot path** - SoA columns are parsed with
//!   straight fixed-stride loops.
//! - **Deterministic** - Same inputs produce same outputs on a platform.
//! - **Synchronous** - No internal threads; callers may parallelize across
//!   independent animations.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use nbl_codec::{ParticleId, Reader};
//!
//! # fn main() -> Result<(), nbl_codec::CodecError> {
//! let file = BufReader::new(File::open("burst.nbl")?);
//! let mut reader = Reader::open(file)?;
//! let live = reader.seek(120)?;
//! if let Some(state) = live.get(ParticleId::new(42)) {
//!     println!("particle 42 at {:?}", state.pos);
//! }
//! # Ok(())
//! # }
//! ```

mod cancel;
mod compress;
mod error;
mod frame;
mod live;
mod reader;
mod transcode;
mod types;
mod validate;
mod writer;

pub use cancel::CancelToken;
pub use compress::{
    compress_frame, decompress_frame, DEFAULT_LEVEL, MAX_FRAME_BYTES, ZSTD_MAGIC,
};
pub use error::{CodecError, CodecResult};
pub use frame::{
    decode_frame, DeltaFrame, FramePayload, KeyFrame, DELTA_ROW_BYTES, FRAME_HEADER_SIZE,
    FRAME_TYPE_DELTA, FRAME_TYPE_KEY, KEY_ROW_BYTES, POS_SCALE, SIZE_SCALE,
};
pub use live::LiveSet;
pub use reader::Reader;
pub use transcode::{transcode, EditOp, TranscodeOptions};
pub use types::{Axis, ParticleId, ParticleState};
pub use validate::{validate_animation, ValidationIssue};
pub use writer::{EncoderOptions, Writer};

pub use nbl_container::{ContainerError, ContainerLimits, FileHeader, TextureEntry};
