//! Static world geometry and the canonical chunk order.
//!
//! The canonical order (x ascending, then y, then z) is shared by store
//! generation, edit sorting and the merge pass. Keeping it in one
//! comparator is what lets the on-disk stream and the edit stream be merged.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coords::{ChunkPos, LocalPos, WorldPos};

/// Upper bound on voxels per chunk. Block counts are stored as `u32` and a
/// whole record is held in memory during a merge.
pub const MAX_BLOCKS_PER_CHUNK: u64 = 1 << 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("chunk size must be positive on every axis, got {0:?}")]
    ZeroChunkSize([u32; 3]),
    #[error("world dimensions must be positive on every axis, got {0:?}")]
    ZeroDimension([u32; 3]),
    #[error("world dimension {0:?} exceeds the chunk coordinate range")]
    DimensionTooLarge([u32; 3]),
    #[error("chunk of size {0:?} exceeds the per-chunk block limit")]
    ChunkTooLarge([u32; 3]),
    #[error("world of {0:?} chunks has more records than can be counted")]
    TooManyChunks([u32; 3]),
}

/// Chunk size and world extent (in chunks) of one world.
///
/// Both are fixed for the lifetime of a store; a store generated with one
/// layout cannot be merged against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLayout {
    chunk_size: [u32; 3],
    dim: [u32; 3],
}

impl WorldLayout {
    pub fn new(chunk_size: [u32; 3], dim: [u32; 3]) -> Result<Self, LayoutError> {
        let layout = Self { chunk_size, dim };
        layout.validate()?;
        Ok(layout)
    }

    /// Layout with the same chunk edge length on every axis.
    pub fn cubic(chunk_size: u32, dim: [u32; 3]) -> Result<Self, LayoutError> {
        Self::new([chunk_size; 3], dim)
    }

    /// Re-check invariants, e.g. after deserializing a layout from disk.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.chunk_size.contains(&0) {
            return Err(LayoutError::ZeroChunkSize(self.chunk_size));
        }
        if self.dim.contains(&0) {
            return Err(LayoutError::ZeroDimension(self.dim));
        }
        if self.dim.iter().any(|&d| d > i32::MAX as u32) {
            return Err(LayoutError::DimensionTooLarge(self.dim));
        }
        let blocks = self
            .chunk_size
            .iter()
            .try_fold(1u64, |acc, &s| acc.checked_mul(s as u64));
        match blocks {
            Some(b) if b <= MAX_BLOCKS_PER_CHUNK => {}
            _ => return Err(LayoutError::ChunkTooLarge(self.chunk_size)),
        }
        if self
            .dim
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d as u64))
            .is_none()
        {
            return Err(LayoutError::TooManyChunks(self.dim));
        }
        Ok(())
    }

    pub fn chunk_size(&self) -> [u32; 3] {
        self.chunk_size
    }

    pub fn dim(&self) -> [u32; 3] {
        self.dim
    }

    /// Number of records a complete store holds: `dim.x * dim.y * dim.z`.
    pub fn chunk_count(&self) -> u64 {
        self.dim.iter().map(|&d| d as u64).product()
    }

    pub fn blocks_per_chunk(&self) -> usize {
        self.chunk_size.iter().map(|&s| s as usize).product()
    }

    /// World extent in voxels, `chunk_size * dim` per axis.
    pub fn world_extent(&self) -> [i64; 3] {
        [0, 1, 2].map(|i| self.chunk_size[i] as i64 * self.dim[i] as i64)
    }

    /// True iff `0 <= pos[i] < chunk_size[i] * dim[i]` on every axis.
    pub fn is_in_bounds(&self, pos: WorldPos) -> bool {
        let extent = self.world_extent();
        pos.axes()
            .iter()
            .zip(extent.iter())
            .all(|(&p, &e)| p >= 0 && p < e)
    }

    /// `floor(pos / chunk_size)` per axis.
    pub fn world_to_chunk(&self, pos: WorldPos) -> ChunkPos {
        let c = [0, 1, 2].map(|i| {
            let q = pos.axes()[i].div_euclid(self.chunk_size[i] as i64);
            q.clamp(i32::MIN as i64, i32::MAX as i64) as i32
        });
        ChunkPos::new(c[0], c[1], c[2])
    }

    /// `pos mod chunk_size` per axis, always in `[0, chunk_size)`.
    pub fn world_to_local(&self, pos: WorldPos) -> LocalPos {
        let l = [0, 1, 2].map(|i| pos.axes()[i].rem_euclid(self.chunk_size[i] as i64) as u32);
        LocalPos::new(l[0], l[1], l[2])
    }

    pub fn contains_chunk(&self, pos: ChunkPos) -> bool {
        [pos.x, pos.y, pos.z]
            .iter()
            .zip(self.dim.iter())
            .all(|(&c, &d)| c >= 0 && (c as u32) < d)
    }

    /// File position of `pos` in a complete store, if the chunk exists.
    pub fn canonical_index(&self, pos: ChunkPos) -> Option<u64> {
        if !self.contains_chunk(pos) {
            return None;
        }
        let [_, dy, dz] = self.dim.map(|d| d as u64);
        Some((pos.x as u64 * dy + pos.y as u64) * dz + pos.z as u64)
    }

    /// Chunk stored at file position `index` in a complete store.
    pub fn canonical_position(&self, index: u64) -> Option<ChunkPos> {
        if index >= self.chunk_count() {
            return None;
        }
        let [_, dy, dz] = self.dim.map(|d| d as u64);
        let z = index % dz;
        let y = (index / dz) % dy;
        let x = index / (dz * dy);
        Some(ChunkPos::new(x as i32, y as i32, z as i32))
    }

    /// Every chunk position, x outer, y middle, z inner (z varies fastest).
    pub fn canonical_positions(&self) -> impl Iterator<Item = ChunkPos> + use<> {
        let [dx, dy, dz] = self.dim.map(|d| d as i32);
        (0..dx).flat_map(move |x| {
            (0..dy).flat_map(move |y| (0..dz).map(move |z| ChunkPos::new(x, y, z)))
        })
    }
}

/// The total order over chunk positions used on both sides of a merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalOrder;

impl CanonicalOrder {
    /// Primary key x, secondary y, tertiary z.
    pub fn cmp(a: &ChunkPos, b: &ChunkPos) -> Ordering {
        a.x.cmp(&b.x)
            .then_with(|| a.y.cmp(&b.y))
            .then_with(|| a.z.cmp(&b.z))
    }

    pub fn is_before(a: &ChunkPos, b: &ChunkPos) -> bool {
        Self::cmp(a, b) == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> WorldLayout {
        WorldLayout::cubic(16, [2, 1, 2]).expect("valid layout")
    }

    #[test]
    fn test_rejects_degenerate_layouts() {
        assert_eq!(
            WorldLayout::cubic(0, [1, 1, 1]),
            Err(LayoutError::ZeroChunkSize([0, 0, 0]))
        );
        assert_eq!(
            WorldLayout::cubic(16, [1, 0, 1]),
            Err(LayoutError::ZeroDimension([1, 0, 1]))
        );
        assert!(matches!(
            WorldLayout::cubic(1024, [1, 1, 1]),
            Err(LayoutError::ChunkTooLarge(_))
        ));
    }

    #[test]
    fn test_world_to_chunk_floors() {
        let l = layout();
        assert_eq!(l.world_to_chunk(WorldPos::new(5, 0, 20)), ChunkPos::new(0, 0, 1));
        assert_eq!(l.world_to_chunk(WorldPos::new(20, 0, 5)), ChunkPos::new(1, 0, 0));
        assert_eq!(l.world_to_chunk(WorldPos::new(15, 15, 15)), ChunkPos::new(0, 0, 0));
        assert_eq!(l.world_to_chunk(WorldPos::new(-1, 0, 0)), ChunkPos::new(-1, 0, 0));
    }

    #[test]
    fn test_world_to_local() {
        let l = layout();
        assert_eq!(l.world_to_local(WorldPos::new(5, 0, 20)), LocalPos::new(5, 0, 4));
        assert_eq!(l.world_to_local(WorldPos::new(20, 0, 5)), LocalPos::new(4, 0, 5));
    }

    #[test]
    fn test_bounds() {
        let l = layout();
        assert!(l.is_in_bounds(WorldPos::new(0, 0, 0)));
        assert!(l.is_in_bounds(WorldPos::new(31, 15, 31)));
        assert!(!l.is_in_bounds(WorldPos::new(32, 0, 0)));
        assert!(!l.is_in_bounds(WorldPos::new(0, 16, 0)));
        assert!(!l.is_in_bounds(WorldPos::new(0, 0, -1)));
    }

    #[test]
    fn test_per_axis_chunk_size() {
        let l = WorldLayout::new([8, 4, 2], [2, 2, 2]).expect("valid layout");
        assert_eq!(l.world_extent(), [16, 8, 4]);
        assert_eq!(l.blocks_per_chunk(), 64);
        assert_eq!(l.world_to_chunk(WorldPos::new(9, 5, 3)), ChunkPos::new(1, 1, 1));
        assert_eq!(l.world_to_local(WorldPos::new(9, 5, 3)), LocalPos::new(1, 1, 1));
    }

    #[test]
    fn test_canonical_positions_order() {
        let l = layout();
        let positions: Vec<_> = l.canonical_positions().collect();
        assert_eq!(
            positions,
            vec![
                ChunkPos::new(0, 0, 0),
                ChunkPos::new(0, 0, 1),
                ChunkPos::new(1, 0, 0),
                ChunkPos::new(1, 0, 1),
            ]
        );
        for pair in positions.windows(2) {
            assert!(CanonicalOrder::is_before(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn test_canonical_index_matches_iteration() {
        let l = WorldLayout::cubic(4, [3, 2, 5]).expect("valid layout");
        for (i, pos) in l.canonical_positions().enumerate() {
            assert_eq!(l.canonical_index(pos), Some(i as u64));
            assert_eq!(l.canonical_position(i as u64), Some(pos));
        }
        assert_eq!(l.canonical_position(30), None);
        assert_eq!(l.canonical_index(ChunkPos::new(3, 0, 0)), None);
        assert_eq!(l.chunk_count(), 30);
    }

    #[test]
    fn test_comparator_keys() {
        let a = ChunkPos::new(0, 5, 5);
        let b = ChunkPos::new(1, 0, 0);
        let c = ChunkPos::new(1, 0, 1);
        assert_eq!(CanonicalOrder::cmp(&a, &b), Ordering::Less);
        assert_eq!(CanonicalOrder::cmp(&c, &b), Ordering::Greater);
        assert_eq!(CanonicalOrder::cmp(&b, &b), Ordering::Equal);
    }
}
