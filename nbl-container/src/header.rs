//! File header codec and constants.

use nbl_bytes::{ByteReader, ByteWriter};

use crate::error::{ContainerError, ContainerResult};

/// Magic bytes identifying an NBL container.
///
/// This value is fixed and must never change across versions.
pub const MAGIC: [u8; 8] = *b"NEBULAFX";

/// Current container format version.
pub const VERSION: u16 = 1;

/// File header size in bytes (48 total).
pub const HEADER_SIZE: usize = 8 + 2 + 2 + 4 + 2 + 2 + 12 + 12 + 4;

/// Attribute bit: per-particle alpha channel present.
pub const ATTR_ALPHA: u16 = 1 << 0;

/// Attribute bit: per-particle size present.
pub const ATTR_SIZE: u16 = 1 << 1;

/// The only attributes combination accepted in version 1.
pub const REQUIRED_ATTRIBUTES: u16 = ATTR_ALPHA | ATTR_SIZE;

/// Decoded file header.
///
/// The magic, version, and reserved bytes are validated during decoding and
/// not stored here; encoding always emits the current [`VERSION`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    /// Intended playback rate in frames per second.
    pub target_fps: u16,
    /// Number of frames in the animation.
    pub total_frames: u32,
    /// Number of entries in the texture block.
    pub texture_count: u16,
    /// Attribute bitmask; must equal [`REQUIRED_ATTRIBUTES`].
    pub attributes: u16,
    /// Componentwise lower corner of the bounding box, in block units.
    pub bbox_min: [f32; 3],
    /// Componentwise upper corner of the bounding box, in block units.
    pub bbox_max: [f32; 3],
}

impl FileHeader {
    /// Encodes the 48-byte header.
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&MAGIC);
        writer.write_u16(VERSION);
        writer.write_u16(self.target_fps);
        writer.write_u32(self.total_frames);
        writer.write_u16(self.texture_count);
        writer.write_u16(self.attributes);
        for v in self.bbox_min {
            writer.write_f32(v);
        }
        for v in self.bbox_max {
            writer.write_f32(v);
        }
        writer.write_bytes(&[0u8; 4]);
    }

    /// Decodes and validates the 48-byte header.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::BadMagic`], [`ContainerError::UnsupportedVersion`],
    /// [`ContainerError::UnsupportedAttributes`], or
    /// [`ContainerError::MalformedHeader`] on validation failure, and a
    /// wrapped [`nbl_bytes::ByteError`] on truncated input.
    pub fn decode(reader: &mut ByteReader<'_>) -> ContainerResult<Self> {
        let magic = reader.read_bytes(8)?;
        if magic != MAGIC {
            let mut found = [0u8; 8];
            found.copy_from_slice(magic);
            return Err(ContainerError::BadMagic { found });
        }

        let version = reader.read_u16()?;
        if version != VERSION {
            return Err(ContainerError::UnsupportedVersion { found: version });
        }

        let target_fps = reader.read_u16()?;
        let total_frames = reader.read_u32()?;
        let texture_count = reader.read_u16()?;

        let attributes = reader.read_u16()?;
        if attributes != REQUIRED_ATTRIBUTES {
            return Err(ContainerError::UnsupportedAttributes { found: attributes });
        }

        let mut bbox_min = [0.0f32; 3];
        for v in &mut bbox_min {
            *v = reader.read_f32()?;
        }
        let mut bbox_max = [0.0f32; 3];
        for v in &mut bbox_max {
            *v = reader.read_f32()?;
        }

        let reserved = reader.read_bytes(4)?;
        if reserved != [0u8; 4] {
            return Err(ContainerError::MalformedHeader);
        }

        Ok(Self {
            target_fps,
            total_frames,
            texture_count,
            attributes,
            bbox_min,
            bbox_max,
        })
    }
}
