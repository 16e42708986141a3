//! Coordinate and block value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer address of a chunk within the world's chunk grid.
///
/// Intentionally not `Ord`: ordering between chunk positions always goes
/// through [`crate::CanonicalOrder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Integer voxel address within the whole world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl WorldPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    pub fn axes(&self) -> [i64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i64; 3]> for WorldPos {
    fn from(v: [i64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for WorldPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Voxel offset inside a single chunk, `[0, chunk_size)` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl LocalPos {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// Block value stored per voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockType(pub u16);

impl BlockType {
    pub const AIR: BlockType = BlockType(0);
    pub const STONE: BlockType = BlockType(1);
    pub const DIRT: BlockType = BlockType(2);
    pub const GRASS: BlockType = BlockType(3);
    pub const WOOD: BlockType = BlockType(4);
    pub const LEAVES: BlockType = BlockType(5);
    pub const BEDROCK: BlockType = BlockType(6);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Content tag carried by every chunk record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    #[default]
    Void,
    Plains,
    Forest,
    Desert,
}

impl Biome {
    pub fn to_u8(self) -> u8 {
        match self {
            Biome::Void => 0,
            Biome::Plains => 1,
            Biome::Forest => 2,
            Biome::Desert => 3,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Biome::Void),
            1 => Some(Biome::Plains),
            2 => Some(Biome::Forest),
            3 => Some(Biome::Desert),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biome_codes() {
        for biome in [Biome::Void, Biome::Plains, Biome::Forest, Biome::Desert] {
            assert_eq!(Biome::from_u8(biome.to_u8()), Some(biome));
        }
        assert_eq!(Biome::from_u8(200), None);
    }

    #[test]
    fn test_default_block_is_air() {
        assert!(BlockType::default().is_air());
        assert!(!BlockType::STONE.is_air());
    }
}
