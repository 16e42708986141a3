//! Chunk record: the unit stored in the log.

use anyhow::{Result, bail};

use crate::coords::{Biome, BlockType, ChunkPos, LocalPos};
use crate::layout::WorldLayout;

/// A chunk's coordinate plus its block contents.
///
/// Blocks are stored dense, Y layers of Z rows of X:
/// `index = (y * size_z + z) * size_x + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub pos: ChunkPos,
    pub biome: Biome,
    size: [u32; 3],
    blocks: Vec<BlockType>,
}

impl ChunkRecord {
    /// All-air record tagged [`Biome::Void`], as written by bulk generation.
    pub fn blank(pos: ChunkPos, layout: &WorldLayout) -> Self {
        Self {
            pos,
            size: layout.chunk_size(),
            biome: Biome::Void,
            blocks: vec![BlockType::AIR; layout.blocks_per_chunk()],
        }
    }

    /// Build a record from decoded parts. The block count must match `size`.
    pub fn from_parts(
        pos: ChunkPos,
        size: [u32; 3],
        biome: Biome,
        blocks: Vec<BlockType>,
    ) -> Result<Self> {
        let expected = size
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(s as usize));
        if expected != Some(blocks.len()) {
            bail!(
                "chunk {} declares size {:?} but carries {} blocks",
                pos,
                size,
                blocks.len()
            );
        }
        Ok(Self {
            pos,
            size,
            biome,
            blocks,
        })
    }

    /// Blocks per axis. Fixed at construction so it always matches `blocks`.
    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    fn index(&self, local: LocalPos) -> Option<usize> {
        let [sx, sy, sz] = self.size;
        if local.x >= sx || local.y >= sy || local.z >= sz {
            return None;
        }
        Some(((local.y as usize * sz as usize) + local.z as usize) * sx as usize + local.x as usize)
    }

    pub fn get(&self, local: LocalPos) -> Option<BlockType> {
        self.index(local).map(|i| self.blocks[i])
    }

    /// Set a single block at a chunk-local offset.
    pub fn set(&mut self, local: LocalPos, block: BlockType) -> Result<()> {
        match self.index(local) {
            Some(i) => {
                self.blocks[i] = block;
                Ok(())
            }
            None => bail!(
                "local offset ({}, {}, {}) outside chunk {} of size {:?}",
                local.x,
                local.y,
                local.z,
                self.pos,
                self.size
            ),
        }
    }

    /// Fill an entire chunk-local Y layer with one block.
    pub fn fill_layer(&mut self, y: u32, block: BlockType) -> Result<()> {
        let [sx, sy, sz] = self.size;
        if y >= sy {
            bail!("layer {} outside chunk {} of height {}", y, self.pos, sy);
        }
        let layer = (sx * sz) as usize;
        let start = y as usize * layer;
        self.blocks[start..start + layer].fill(block);
        Ok(())
    }

    pub fn non_air_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }
}
