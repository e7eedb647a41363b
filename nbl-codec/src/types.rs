//! Core particle types.

use std::fmt;

/// A stable particle identifier.
///
/// IDs are assigned by the producer and must remain stable for the lifetime
/// of a particle within one animation. Within any single frame all IDs are
/// distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ParticleId(i32);

impl ParticleId {
    /// Creates a new particle ID.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for ParticleId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<ParticleId> for i32 {
    fn from(id: ParticleId) -> Self {
        id.0
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Materialized state of one particle at one frame.
///
/// `size` is held in stored units of hundredths; the real sprite size in
/// block units is `size / 100.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleState {
    /// Position in block units.
    pub pos: [f32; 3],
    /// RGBA color.
    pub color: [u8; 4],
    /// Sprite size in hundredths of a block.
    pub size: u16,
    /// Index into the texture block.
    pub tex_id: u8,
    /// Sprite-sheet cell index.
    pub seq_idx: u8,
}

impl ParticleState {
    /// Returns the sprite size in block units.
    #[must_use]
    pub fn real_size(&self) -> f32 {
        f32::from(self.size) / 100.0
    }
}

/// A coordinate axis, used in delta overflow reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        write!(f, "{name}")
    }
}
