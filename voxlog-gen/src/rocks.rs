use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxlog_edit::EditBuffer;
use voxlog_record::{BlockType, WorldLayout, WorldPos};

use crate::{ContentProducer, FlatHeight, HeightMap};

/// Scatters single blocks at random surface positions.
pub struct Rocks<H: HeightMap = FlatHeight> {
    pub count: usize,
    pub seed: u64,
    pub block: BlockType,
    pub height: H,
}

impl<H: HeightMap> ContentProducer for Rocks<H> {
    fn name(&self) -> &str {
        "rocks"
    }

    fn produce(&self, layout: &WorldLayout, edits: &mut EditBuffer) -> usize {
        let [ex, _, ez] = layout.world_extent();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut accepted = 0;
        for _ in 0..self.count {
            let x = rng.gen_range(0..ex);
            let z = rng.gen_range(0..ez);
            let y = self.height.height_at(x, z);
            if edits.add(WorldPos::new(x, y, z), self.block) {
                accepted += 1;
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rocks(seed: u64) -> Rocks {
        Rocks {
            count: 1000,
            seed,
            block: BlockType::STONE,
            height: FlatHeight(3),
        }
    }

    #[test]
    fn test_rocks_are_reproducible() {
        let layout = WorldLayout::cubic(16, [4, 1, 4]).unwrap();
        let mut a = EditBuffer::new(layout);
        let mut b = EditBuffer::new(layout);
        assert_eq!(rocks(7).produce(&layout, &mut a), 1000);
        rocks(7).produce(&layout, &mut b);
        assert_eq!(a.edits(), b.edits());
        assert!(a.edits().iter().all(|e| e.pos.y == 3));
    }

    #[test]
    fn test_rocks_above_world_are_rejected() {
        let layout = WorldLayout::cubic(4, [1, 1, 1]).unwrap();
        let mut edits = EditBuffer::new(layout);
        let high = Rocks {
            height: FlatHeight(10),
            ..rocks(1)
        };
        assert_eq!(high.produce(&layout, &mut edits), 0);
    }
}
