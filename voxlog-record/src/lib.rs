//! On-disk data model for the voxel chunk log.
//!
//! This crate handles:
//! - World-space / chunk-space / chunk-local coordinates
//! - The static world geometry ([`WorldLayout`]) and the canonical chunk order
//! - Chunk records and their framed binary encoding

pub mod chunk;
pub mod codec;
pub mod coords;
pub mod layout;

pub use chunk::ChunkRecord;
pub use codec::{
    Compression, FORMAT_VERSION, encode_record, read_record, read_record_sized, write_record,
};
pub use coords::{Biome, BlockType, ChunkPos, LocalPos, WorldPos};
pub use layout::{CanonicalOrder, LayoutError, WorldLayout};
