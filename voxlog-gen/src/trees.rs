use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxlog_edit::EditBuffer;
use voxlog_record::{BlockType, WorldLayout, WorldPos};

use crate::{ContentProducer, FlatHeight, HeightMap};

const TRUNK_HEIGHT: i64 = 4;
const CROWN_RADIUS: i64 = 1;

/// Trunk of wood topped by a cube of leaves. Trees may straddle chunk
/// borders; parts outside the world are dropped.
pub struct Trees<H: HeightMap = FlatHeight> {
    pub count: usize,
    pub seed: u64,
    pub height: H,
}

impl<H: HeightMap> ContentProducer for Trees<H> {
    fn name(&self) -> &str {
        "trees"
    }

    fn produce(&self, layout: &WorldLayout, edits: &mut EditBuffer) -> usize {
        let [ex, _, ez] = layout.world_extent();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut accepted = 0;
        for _ in 0..self.count {
            let x = rng.gen_range(0..ex);
            let z = rng.gen_range(0..ez);
            let base = self.height.height_at(x, z);
            let top = base + TRUNK_HEIGHT;

            accepted += edits.add_box(
                WorldPos::new(x - CROWN_RADIUS, top - CROWN_RADIUS, z - CROWN_RADIUS),
                WorldPos::new(x + CROWN_RADIUS, top + CROWN_RADIUS, z + CROWN_RADIUS),
                BlockType::LEAVES,
            );
            // Trunk goes in last so it wins over the crown.
            accepted += edits.add_box(
                WorldPos::new(x, base, z),
                WorldPos::new(x, top, z),
                BlockType::WOOD,
            );
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tree_inside_world() {
        let layout = WorldLayout::cubic(16, [1, 1, 1]).unwrap();
        let mut edits = EditBuffer::new(layout);
        let trees = Trees {
            count: 1,
            seed: 3,
            height: FlatHeight(2),
        };
        let accepted = trees.produce(&layout, &mut edits);
        // Crown may be clipped at the world edge; trunk never is.
        assert!(accepted >= 5);
        assert!(accepted <= 27 + 5);
        let wood = edits.edits().iter().filter(|e| e.block == BlockType::WOOD).count();
        assert_eq!(wood, 5);
    }
}
