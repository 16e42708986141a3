use voxlog_edit::{EditBuffer, World};
use voxlog_record::WorldLayout;

/// Anything that places content into the world by enqueuing edits.
///
/// Producers work purely in world space; chunking is the buffer's concern.
pub trait ContentProducer {
    fn name(&self) -> &str;

    /// Enqueue edits, returning how many the buffer accepted.
    fn produce(&self, layout: &WorldLayout, edits: &mut EditBuffer) -> usize;
}

/// Terrain height query used to place things on the surface.
pub trait HeightMap {
    fn height_at(&self, x: i64, z: i64) -> i64;
}

/// Same surface height everywhere.
#[derive(Debug, Clone, Copy)]
pub struct FlatHeight(pub i64);

impl HeightMap for FlatHeight {
    fn height_at(&self, _x: i64, _z: i64) -> i64 {
        self.0
    }
}

/// What one producer pass did.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub producer: String,
    pub accepted: usize,
    pub committed: bool,
}

/// Run each producer and evaluate its edits in its own merge pass.
pub fn populate(world: &mut World, producers: &[&dyn ContentProducer]) -> Vec<PassOutcome> {
    let mut outcomes = Vec::with_capacity(producers.len());
    for producer in producers {
        log::info!("Adding {}", producer.name());
        let layout = *world.layout();
        let accepted = producer.produce(&layout, world.buffer_mut());
        let committed = world.evaluate();
        outcomes.push(PassOutcome {
            producer: producer.name().to_string(),
            accepted,
            committed,
        });
    }
    outcomes
}

pub mod flat;
pub mod rocks;
pub mod trees;

pub use flat::Floor;
pub use rocks::Rocks;
pub use trees::Trees;

#[cfg(test)]
mod tests {
    use super::*;
    use voxlog_record::{BlockType, ChunkPos, LocalPos};
    use voxlog_storage::StoreConfig;

    #[test]
    fn test_populate_one_pass_per_producer() {
        let dir = tempfile::tempdir().unwrap();
        let layout = WorldLayout::cubic(8, [2, 2, 2]).unwrap();
        let mut world = World::create(StoreConfig::new(dir.path()), layout).unwrap();

        let floor = Floor { y: 0, block: BlockType::BEDROCK };
        let rocks = Rocks {
            count: 50,
            seed: 42,
            block: BlockType::STONE,
            height: FlatHeight(1),
        };
        let outcomes = populate(&mut world, &[&floor, &rocks]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.committed));
        assert_eq!(outcomes[0].accepted, 16 * 16);
        assert_eq!(outcomes[1].accepted, 50);

        let chunk = world.log().find(ChunkPos::new(1, 0, 1)).unwrap().unwrap();
        assert_eq!(chunk.get(LocalPos::new(3, 0, 3)), Some(BlockType::BEDROCK));
        let upper = world.log().find(ChunkPos::new(0, 1, 0)).unwrap().unwrap();
        assert_eq!(upper.non_air_count(), 0);
    }

    #[test]
    fn test_populate_with_nothing_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let layout = WorldLayout::cubic(4, [1, 1, 1]).unwrap();
        let mut world = World::create(StoreConfig::new(dir.path()), layout).unwrap();
        let floor = Floor { y: 100, block: BlockType::DIRT };
        let outcomes = populate(&mut world, &[&floor]);
        assert_eq!(outcomes[0].accepted, 0);
        assert!(!outcomes[0].committed);
    }
}
