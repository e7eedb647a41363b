//! Container metadata codec for NBL particle animation files.
//!
//! This crate reads and writes the metadata region of an NBL container: the
//! 48-byte file header, the texture block, the frame index table, and the
//! keyframe index table. Frame payloads and compression live in the codec
//! crate; this layer only knows where the chunks are.
//!
//! # Design Principles
//!
//! - **Validate on read** - Every invariant the format states is checked
//!   while loading, so downstream code can trust the tables.
//! - **Bounded decoding** - [`ContainerLimits`] caps every allocation made
//!   from untrusted input.
//! - **Deterministic output** - Same metadata produces the same bytes.

mod error;
mod header;
mod index;
mod limits;
mod texture;

pub use error::{
    ContainerError, ContainerResult, IndexFault, KeyframeFault, LimitKind,
};
pub use header::{
    FileHeader, ATTR_ALPHA, ATTR_SIZE, HEADER_SIZE, MAGIC, REQUIRED_ATTRIBUTES, VERSION,
};
pub use index::{
    data_start, FrameIndex, FrameIndexEntry, KeyframeTable, INDEX_ENTRY_SIZE,
};
pub use limits::ContainerLimits;
pub use texture::{
    decode_texture_block, encode_texture_block, texture_block_len, TextureEntry,
};
