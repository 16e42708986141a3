use std::fmt;

use thiserror::Error;
use voxlog_record::{BlockType, CanonicalOrder, ChunkPos, LocalPos, WorldLayout, WorldPos};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("edit at {pos} is outside the world extent {extent:?}")]
    OutOfBounds { pos: WorldPos, extent: [i64; 3] },
    #[error("cannot combine edit buffers of different layouts")]
    LayoutMismatch,
}

/// A pending block change.
///
/// `cpos` and `local` are derived from `pos` once, when the edit is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub pos: WorldPos,
    pub cpos: ChunkPos,
    pub local: LocalPos,
    pub block: BlockType,
    /// Insertion order; the only tie-break between edits of one chunk.
    pub seq: u64,
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} -> {:?} (chunk {})", self.seq, self.pos, self.block, self.cpos)
    }
}

/// Pending edits for one world, in insertion order until prepared.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    layout: WorldLayout,
    edits: Vec<Edit>,
    next_seq: u64,
}

impl EditBuffer {
    pub fn new(layout: WorldLayout) -> Self {
        Self {
            layout,
            edits: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    /// Enqueue a block change. Returns false, enqueuing nothing, when `pos` is
    /// outside the world.
    pub fn add(&mut self, pos: WorldPos, block: BlockType) -> bool {
        match self.try_add(pos, block) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Rejected edit: {}", e);
                false
            }
        }
    }

    pub fn try_add(&mut self, pos: WorldPos, block: BlockType) -> Result<(), EditError> {
        if !self.layout.is_in_bounds(pos) {
            return Err(EditError::OutOfBounds {
                pos,
                extent: self.layout.world_extent(),
            });
        }
        self.edits.push(Edit {
            pos,
            cpos: self.layout.world_to_chunk(pos),
            local: self.layout.world_to_local(pos),
            block,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        Ok(())
    }

    /// Enqueue every voxel of the inclusive box `min..=max`. Returns how many
    /// edits were accepted; voxels outside the world are skipped.
    pub fn add_box(&mut self, min: WorldPos, max: WorldPos, block: BlockType) -> usize {
        let mut accepted = 0;
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    if self.add(WorldPos::new(x, y, z), block) {
                        accepted += 1;
                    }
                }
            }
        }
        accepted
    }

    /// Append another buffer's edits after this buffer's, keeping their relative order.
    ///
    /// Lets producers fill private buffers that are combined before one merge pass.
    pub fn absorb(&mut self, other: EditBuffer) -> Result<(), EditError> {
        if other.layout != self.layout {
            return Err(EditError::LayoutMismatch);
        }
        let mut incoming = other.edits;
        incoming.sort_by_key(|e| e.seq);
        for mut edit in incoming {
            edit.seq = self.next_seq;
            self.next_seq += 1;
            self.edits.push(edit);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    /// Buffered edits, e.g. for mirroring into a live chunk cache.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Sort into canonical chunk order. The sort is stable, so edits sharing a
    /// chunk stay in insertion order and the last inserted edit to a voxel wins.
    pub fn prepare_for_merge(&mut self) {
        self.edits
            .sort_by(|a, b| CanonicalOrder::cmp(&a.cpos, &b.cpos));
    }

    /// Drain the buffer into a sorted, read-only sequence for one merge pass.
    pub fn take_prepared(&mut self) -> PreparedEdits {
        self.prepare_for_merge();
        PreparedEdits {
            edits: std::mem::take(&mut self.edits),
            cursor: 0,
        }
    }
}

/// Edits in canonical order, consumed front to back by a cursor.
#[derive(Debug, Clone)]
pub struct PreparedEdits {
    edits: Vec<Edit>,
    cursor: usize,
}

impl PreparedEdits {
    /// Chunk of the next pending edit.
    pub fn next_chunk(&self) -> Option<ChunkPos> {
        self.edits.get(self.cursor).map(|e| e.cpos)
    }

    /// Consume every pending edit for `pos` (they are contiguous).
    pub fn take_for(&mut self, pos: ChunkPos) -> &[Edit] {
        let start = self.cursor;
        let run = self.edits[start..]
            .iter()
            .take_while(|e| e.cpos == pos)
            .count();
        self.cursor += run;
        &self.edits[start..self.cursor]
    }

    pub fn remaining(&self) -> usize {
        self.edits.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn as_slice(&self) -> &[Edit] {
        &self.edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> EditBuffer {
        EditBuffer::new(WorldLayout::cubic(16, [2, 1, 2]).unwrap())
    }

    #[test]
    fn test_add_derives_chunk_coords() {
        let mut buf = buffer();
        assert!(buf.add(WorldPos::new(5, 0, 20), BlockType::STONE));
        let edit = buf.edits()[0];
        assert_eq!(edit.cpos, ChunkPos::new(0, 0, 1));
        assert_eq!(edit.local, LocalPos::new(5, 0, 4));
        assert_eq!(edit.seq, 0);
    }

    #[test]
    fn test_bounds_rejection() {
        let mut buf = buffer();
        buf.add(WorldPos::new(1, 1, 1), BlockType::STONE);
        let rejected = [
            WorldPos::new(-1, 0, 0),
            WorldPos::new(0, -1, 0),
            WorldPos::new(0, 0, -1),
            WorldPos::new(32, 0, 0),
            WorldPos::new(0, 16, 0),
            WorldPos::new(0, 0, 32),
        ];
        for pos in rejected {
            assert!(!buf.add(pos, BlockType::STONE), "{} accepted", pos);
            assert_eq!(buf.len(), 1);
        }
        assert_eq!(
            buf.try_add(WorldPos::new(32, 0, 0), BlockType::STONE),
            Err(EditError::OutOfBounds {
                pos: WorldPos::new(32, 0, 0),
                extent: [32, 16, 32],
            })
        );
    }

    #[test]
    fn test_prepare_is_canonical_and_stable() {
        let mut buf = buffer();
        buf.add(WorldPos::new(20, 0, 20), BlockType::STONE); // (1,0,1)
        buf.add(WorldPos::new(3, 3, 3), BlockType::DIRT); // (0,0,0)
        buf.add(WorldPos::new(20, 0, 5), BlockType::WOOD); // (1,0,0)
        buf.add(WorldPos::new(3, 3, 3), BlockType::GRASS); // (0,0,0), same voxel
        buf.add(WorldPos::new(5, 0, 20), BlockType::LEAVES); // (0,0,1)
        buf.prepare_for_merge();

        let order: Vec<_> = buf.edits().iter().map(|e| (e.cpos, e.seq)).collect();
        assert_eq!(
            order,
            vec![
                (ChunkPos::new(0, 0, 0), 1),
                (ChunkPos::new(0, 0, 0), 3),
                (ChunkPos::new(0, 0, 1), 4),
                (ChunkPos::new(1, 0, 0), 2),
                (ChunkPos::new(1, 0, 1), 0),
            ]
        );
    }

    #[test]
    fn test_take_prepared_drains() {
        let mut buf = buffer();
        buf.add(WorldPos::new(0, 0, 0), BlockType::STONE);
        buf.add(WorldPos::new(1, 0, 0), BlockType::STONE);
        buf.add(WorldPos::new(17, 0, 0), BlockType::STONE);
        let mut prepared = buf.take_prepared();
        assert!(buf.is_empty());
        assert_eq!(prepared.remaining(), 3);

        assert_eq!(prepared.next_chunk(), Some(ChunkPos::new(0, 0, 0)));
        assert_eq!(prepared.take_for(ChunkPos::new(0, 0, 0)).len(), 2);
        assert_eq!(prepared.next_chunk(), Some(ChunkPos::new(1, 0, 0)));
        assert_eq!(prepared.take_for(ChunkPos::new(0, 0, 1)).len(), 0);
        assert_eq!(prepared.take_for(ChunkPos::new(1, 0, 0)).len(), 1);
        assert!(prepared.is_empty());
        assert_eq!(prepared.next_chunk(), None);
    }

    #[test]
    fn test_add_box_skips_outside() {
        let mut buf = buffer();
        let accepted = buf.add_box(WorldPos::new(-1, 0, 0), WorldPos::new(1, 1, 0), BlockType::STONE);
        assert_eq!(accepted, 4);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_absorb_resequences() {
        let mut a = buffer();
        let mut b = buffer();
        a.add(WorldPos::new(0, 0, 0), BlockType::STONE);
        b.add(WorldPos::new(0, 0, 0), BlockType::DIRT);
        b.add(WorldPos::new(1, 0, 0), BlockType::DIRT);
        a.absorb(b).unwrap();
        let seqs: Vec<_> = a.edits().iter().map(|e| (e.seq, e.block)).collect();
        assert_eq!(
            seqs,
            vec![(0, BlockType::STONE), (1, BlockType::DIRT), (2, BlockType::DIRT)]
        );

        let other = EditBuffer::new(WorldLayout::cubic(8, [1, 1, 1]).unwrap());
        assert_eq!(a.absorb(other), Err(EditError::LayoutMismatch));
    }
}
