//! Texture block codec.

use nbl_bytes::{ByteReader, ByteWriter};

use crate::error::{ContainerError, ContainerResult, LimitKind};
use crate::limits::ContainerLimits;

/// One texture descriptor: a resource path plus its sprite-sheet grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    /// Resource path, at most 65535 UTF-8 bytes.
    pub path: String,
    /// Sprite-sheet rows, 1..=255.
    pub rows: u8,
    /// Sprite-sheet columns, 1..=255.
    pub cols: u8,
}

impl TextureEntry {
    /// Returns the encoded size of this entry in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        2 + self.path.len() + 1 + 1
    }
}

/// Returns the encoded size of a whole texture block in bytes.
#[must_use]
pub fn texture_block_len(textures: &[TextureEntry]) -> usize {
    textures.iter().map(TextureEntry::encoded_len).sum()
}

/// Encodes the texture block.
///
/// # Errors
///
/// Returns a wrapped [`nbl_bytes::ByteError::StringTooLong`] if a path
/// exceeds the u16 length prefix.
pub fn encode_texture_block(
    textures: &[TextureEntry],
    writer: &mut ByteWriter,
) -> ContainerResult<()> {
    for texture in textures {
        writer.write_string(&texture.path)?;
        writer.write_u8(texture.rows);
        writer.write_u8(texture.cols);
    }
    Ok(())
}

/// Decodes `count` texture entries.
///
/// # Errors
///
/// Returns [`ContainerError::MalformedTexture`] for a zero row or column
/// count, [`ContainerError::LimitExceeded`] if the block outgrows
/// `limits.max_texture_block_bytes`, and wrapped byte errors on truncated
/// or non-UTF-8 input.
pub fn decode_texture_block(
    reader: &mut ByteReader<'_>,
    count: u16,
    limits: &ContainerLimits,
) -> ContainerResult<Vec<TextureEntry>> {
    let start = reader.position();
    let mut textures = Vec::with_capacity(count as usize);
    for index in 0..count as usize {
        let path = reader.read_string()?;
        let rows = reader.read_u8()?;
        let cols = reader.read_u8()?;
        if rows == 0 || cols == 0 {
            return Err(ContainerError::MalformedTexture { index });
        }

        let block_bytes = (reader.position() - start) as u64;
        if block_bytes > limits.max_texture_block_bytes {
            return Err(ContainerError::LimitExceeded {
                kind: LimitKind::TextureBlockBytes,
                limit: limits.max_texture_block_bytes,
                actual: block_bytes,
            });
        }

        textures.push(TextureEntry { path, rows, cols });
    }
    Ok(textures)
}
