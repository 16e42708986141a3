use voxlog_edit::EditBuffer;
use voxlog_record::{BlockType, WorldLayout, WorldPos};

use crate::ContentProducer;

/// Fills one world-space Y layer across the whole world.
pub struct Floor {
    pub y: i64,
    pub block: BlockType,
}

impl ContentProducer for Floor {
    fn name(&self) -> &str {
        "floor"
    }

    fn produce(&self, layout: &WorldLayout, edits: &mut EditBuffer) -> usize {
        let [ex, _, ez] = layout.world_extent();
        edits.add_box(
            WorldPos::new(0, self.y, 0),
            WorldPos::new(ex - 1, self.y, ez - 1),
            self.block,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_covers_layer() {
        let layout = WorldLayout::cubic(4, [2, 2, 3]).unwrap();
        let mut edits = EditBuffer::new(layout);
        let floor = Floor { y: 5, block: BlockType::DIRT };
        assert_eq!(floor.produce(&layout, &mut edits), 8 * 12);
        assert!(edits.edits().iter().all(|e| e.pos.y == 5 && e.cpos.y == 1));
    }

    #[test]
    fn test_floor_outside_world_adds_nothing() {
        let layout = WorldLayout::cubic(4, [1, 1, 1]).unwrap();
        let mut edits = EditBuffer::new(layout);
        let floor = Floor { y: 4, block: BlockType::DIRT };
        assert_eq!(floor.produce(&layout, &mut edits), 0);
        assert!(edits.is_empty());
    }
}
